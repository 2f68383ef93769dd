//! Shared primitives for the devflow automation crates.
//!
//! Selectors describe *what* to look for, queries are the single
//! concrete lookups a device bridge evaluates, and the geometry types
//! carry screen coordinates between the locator and the popup guard.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while building core values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("selector has no identifier, path or text set")]
    EmptySelector,
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeviceSerial(pub String);

impl DeviceSerial {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one flow execution in logs.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Screen rectangle of an element, in device pixels.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Geometric center of the rectangle.
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WindowSize {
    pub width: i32,
    pub height: i32,
}

impl WindowSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 2340,
        }
    }
}

/// A single lookup evaluated against the device's UI tree.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Query {
    ResourceId(String),
    XPath(String),
    Text(String),
    TextContains(String),
    ClassName(String),
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::ResourceId(id) => write!(f, "id={}", id),
            Query::XPath(path) => write!(f, "xpath={}", path),
            Query::Text(text) => write!(f, "text={:?}", text),
            Query::TextContains(text) => write!(f, "text~={:?}", text),
            Query::ClassName(class) => write!(f, "class={}", class),
        }
    }
}

/// Describes one UI element by identifier, structural path or visible text.
///
/// Lookups try the fields in a fixed order (identifier, path, exact text,
/// partial text) and stop at the first query that matches.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Selector {
    /// Human readable label used in logs
    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub label: Option<String>,

    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub resource_id: Option<String>,

    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub path: Option<String>,

    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub text: Option<String>,

    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub text_contains: Option<String>,

    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub class_name: Option<String>,
}

impl Selector {
    pub fn id(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        Self {
            text_contains: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.queries().is_empty() {
            Err(CoreError::EmptySelector)
        } else {
            Ok(())
        }
    }

    /// Concrete queries in lookup priority order.
    pub fn queries(&self) -> Vec<Query> {
        let mut queries = Vec::with_capacity(4);
        if let Some(id) = &self.resource_id {
            queries.push(Query::ResourceId(id.clone()));
        }
        if let Some(path) = &self.path {
            queries.push(Query::XPath(path.clone()));
        }
        if let Some(text) = &self.text {
            queries.push(Query::Text(text.clone()));
        }
        if let Some(text) = &self.text_contains {
            queries.push(Query::TextContains(text.clone()));
        }
        if let Some(class) = &self.class_name {
            queries.push(Query::ClassName(class.clone()));
        }
        queries
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            return f.write_str(label);
        }
        let parts: Vec<String> = self.queries().iter().map(ToString::to_string).collect();
        if parts.is_empty() {
            f.write_str("<empty selector>")
        } else {
            f.write_str(&parts.join(" | "))
        }
    }
}
