//! Types shared by the locator and its callers

use devflow_core_types::{Bounds, Point, Query};
use ui_bridge::ElementInfo;

/// An element found in one specific UI snapshot.
///
/// Handles are not kept across steps: the host UI mutates between calls,
/// so every access through the locator re-resolves the selector.
#[derive(Debug)]
pub struct ElementHandle {
    /// The query that matched
    pub query: Query,
    pub info: ElementInfo,
}

impl ElementHandle {
    pub fn text(&self) -> &str {
        &self.info.text
    }

    pub fn is_enabled(&self) -> bool {
        self.info.enabled
    }

    pub fn is_clickable(&self) -> bool {
        self.info.clickable
    }

    pub fn bounds(&self) -> Bounds {
        self.info.bounds
    }

    pub fn center(&self) -> Point {
        self.info.bounds.center()
    }
}
