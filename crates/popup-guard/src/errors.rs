//! Popup catalog errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PopupError {
    #[error("Duplicate popup name: {0}")]
    DuplicateName(String),

    #[error("Popup {popup} has an empty {field} selector")]
    EmptySelector { popup: String, field: &'static str },
}
