//! The UI-query collaborator consumed by the engine

use async_trait::async_trait;
use devflow_core_types::{Bounds, DeviceSerial, Point, Query, WindowSize};
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Attributes of an element as seen in one UI snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub resource_id: Option<String>,
    pub text: String,
    pub class_name: Option<String>,
    pub path: Option<String>,
    pub enabled: bool,
    pub clickable: bool,
    pub bounds: Bounds,
}

/// A live device session.
///
/// Implementations serialize access to the underlying session themselves;
/// callers issue one operation at a time per device. Every method takes a
/// fresh snapshot, nothing is cached between calls.
#[async_trait]
pub trait UiDevice: Send + Sync {
    /// Serial of the device this session drives
    fn serial(&self) -> &DeviceSerial;

    /// First visible element matching `query`, if any
    async fn query(&self, query: &Query) -> Result<Option<ElementInfo>, BridgeError>;

    /// Tap the element matching `query`; `Ok(false)` when nothing matched
    async fn tap_element(&self, query: &Query) -> Result<bool, BridgeError>;

    /// Tap raw screen coordinates
    async fn tap_at(&self, point: Point) -> Result<(), BridgeError>;

    /// Replace the text of the element matching `query`; `Ok(false)` when nothing matched
    async fn set_text(&self, query: &Query, text: &str) -> Result<bool, BridgeError>;

    async fn window_size(&self) -> Result<WindowSize, BridgeError>;
}
