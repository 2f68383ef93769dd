//! Input resolver types

use std::time::Duration;

use devflow_core_types::{Point, Selector};
use serde::{Deserialize, Serialize};

/// Input strategies, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputStrategyKind {
    Direct,
    EditLastCharacter,
    DigitByDigit,
}

impl InputStrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            InputStrategyKind::Direct => "direct",
            InputStrategyKind::EditLastCharacter => "edit-last-character",
            InputStrategyKind::DigitByDigit => "digit-by-digit",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> Vec<InputStrategyKind> {
        vec![
            InputStrategyKind::Direct,
            InputStrategyKind::EditLastCharacter,
            InputStrategyKind::DigitByDigit,
        ]
    }
}

/// Where the text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTarget {
    /// Container tapped first to focus the field
    pub focus: Option<Selector>,

    /// The editable field itself
    pub field: Selector,
}

impl InputTarget {
    pub fn field(field: Selector) -> Self {
        Self { focus: None, field }
    }

    pub fn with_focus(mut self, focus: Selector) -> Self {
        self.focus = Some(focus);
        self
    }
}

/// Delays between input steps, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTimings {
    pub focus_settle_ms: u64,
    pub field_timeout_ms: u64,
    pub after_set_ms: u64,
    pub after_blur_ms: u64,
    pub edit_gap_ms: u64,
    pub clear_settle_ms: u64,
    pub keystroke_gap_ms: u64,
    pub final_settle_ms: u64,

    /// Screen point tapped to blur the field; window center when unset
    pub blur_point: Option<Point>,
}

impl Default for InputTimings {
    fn default() -> Self {
        Self {
            focus_settle_ms: 500,   // let the keyboard come up
            field_timeout_ms: 2000, // field must show up within 2 seconds
            after_set_ms: 500,
            after_blur_ms: 500,
            edit_gap_ms: 300,
            clear_settle_ms: 500,
            keystroke_gap_ms: 200,
            final_settle_ms: 500,
            blur_point: None,
        }
    }
}

impl InputTimings {
    pub(crate) fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// Result of one strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyAttempt {
    pub strategy: InputStrategyKind,
    pub applied: bool,
    pub verified: bool,
}

/// Overall result of an input request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputOutcome {
    pub success: bool,

    /// Strategy that satisfied the request
    pub strategy: Option<InputStrategyKind>,

    pub attempts: Vec<StrategyAttempt>,
}

impl InputOutcome {
    pub fn failed(attempts: Vec<StrategyAttempt>) -> Self {
        Self {
            success: false,
            strategy: None,
            attempts,
        }
    }
}
