//! Error types for the device bridge

use thiserror::Error;

/// Failures raised by a device bridge.
///
/// "Element not found" is never an error at this layer; queries return
/// `Ok(None)` and taps return `Ok(false)` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The device session went away (device unplugged, bridge restarted)
    #[error("Device session lost: {0}")]
    SessionLost(String),

    /// Transport-level failure while talking to the device
    #[error("Bridge transport error: {0}")]
    Transport(String),

    /// A rehearsal scenario is malformed
    #[error("Invalid scenario: {0}")]
    Scenario(String),

    /// Requested device is not known to the provider
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

impl BridgeError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Transport(_))
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            BridgeError::SessionLost(_) => 3,
            BridgeError::Transport(_) => 2,
            BridgeError::Scenario(_) | BridgeError::UnknownDevice(_) => 1,
        }
    }
}
