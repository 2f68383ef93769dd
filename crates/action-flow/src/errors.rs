//! Flow execution error types
//!
//! Ordinary flow failures (element missing, wrong message, timeout) are
//! reported as `Ok(false)`. These errors are reserved for problems the
//! engine must not mask, such as a lost device session.

use action_primitives::ActionError;
use popup_guard::PopupError;
use thiserror::Error;
use ui_bridge::BridgeError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Locator or bridge failure
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Engine configuration is unusable
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Popup catalog is unusable
    #[error("Invalid popup catalog: {0}")]
    Popup(#[from] PopupError),
}

impl FlowError {
    /// The device session is gone; the caller has to reconnect
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            FlowError::Action(ActionError::Bridge(BridgeError::SessionLost(_)))
        )
    }

    /// Check if retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Action(err) => err.is_retryable(),
            FlowError::InvalidConfig(_) | FlowError::Popup(_) => false,
        }
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            FlowError::Action(err) => err.severity(),
            FlowError::InvalidConfig(_) | FlowError::Popup(_) => 2,
        }
    }
}
