//! Error types for action primitives

use thiserror::Error;
use ui_bridge::BridgeError;

/// Error types for locator operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Selector resolved to nothing at call time
    #[error("Element not found: {0}")]
    NotFound(String),

    /// Selector has no usable field
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The device bridge failed underneath us
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ActionError {
    /// `NotFound` is an expected outcome callers branch on
    pub fn is_not_found(&self) -> bool {
        matches!(self, ActionError::NotFound(_))
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::NotFound(_) => true,
            ActionError::Bridge(err) => err.is_retryable(),
            ActionError::InvalidSelector(_) => false,
        }
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::NotFound(_) => 0,
            ActionError::InvalidSelector(_) => 2,
            ActionError::Bridge(err) => err.severity(),
        }
    }
}
