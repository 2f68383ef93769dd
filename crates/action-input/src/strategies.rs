//! Text entry strategies
//!
//! Each strategy only reports whether it could run to completion. Whether
//! the host app accepted the input is judged by the resolver afterwards.

use action_primitives::{ActionError, ElementLocator};
use async_trait::async_trait;
use devflow_core_types::Selector;
use tracing::debug;

use crate::types::{InputStrategyKind, InputTimings};

/// A way of getting text into a field.
#[async_trait]
pub trait InputStrategy: Send + Sync {
    /// Run the strategy; `Ok(false)` when it could not be applied.
    async fn apply(
        &self,
        locator: &ElementLocator,
        field: &Selector,
        text: &str,
    ) -> Result<bool, ActionError>;

    /// Get strategy type
    fn kind(&self) -> InputStrategyKind;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Maps "element went away" to a soft strategy failure.
fn soft(result: Result<(), ActionError>) -> Result<bool, ActionError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Set the full text, then tap elsewhere so the field loses focus.
pub struct DirectStrategy {
    timings: InputTimings,
}

impl DirectStrategy {
    pub fn new(timings: InputTimings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl InputStrategy for DirectStrategy {
    async fn apply(
        &self,
        locator: &ElementLocator,
        field: &Selector,
        text: &str,
    ) -> Result<bool, ActionError> {
        if !soft(locator.set_text(field, text).await)? {
            return Ok(false);
        }
        locator.settle(InputTimings::ms(self.timings.after_set_ms)).await;

        let blur = match self.timings.blur_point {
            Some(point) => point,
            None => locator.window_size().await?.center(),
        };
        debug!(serial = %locator.serial(), %blur, "Tapping away from field");
        locator.tap_at(blur).await?;
        locator.settle(InputTimings::ms(self.timings.after_blur_ms)).await;

        Ok(true)
    }

    fn kind(&self) -> InputStrategyKind {
        InputStrategyKind::Direct
    }
}

/// Remove the last character and put it back, forcing a change event on a
/// field that already holds the text.
pub struct EditLastCharacterStrategy {
    timings: InputTimings,
}

impl EditLastCharacterStrategy {
    pub fn new(timings: InputTimings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl InputStrategy for EditLastCharacterStrategy {
    async fn apply(
        &self,
        locator: &ElementLocator,
        field: &Selector,
        text: &str,
    ) -> Result<bool, ActionError> {
        let current = match locator.read_text(field).await {
            Ok(current) => current,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };
        if current.is_empty() {
            debug!(serial = %locator.serial(), "Field is empty; nothing to edit");
            return Ok(false);
        }

        let mut shortened = text.to_string();
        shortened.pop();

        if !soft(locator.set_text(field, &shortened).await)? {
            return Ok(false);
        }
        locator.settle(InputTimings::ms(self.timings.edit_gap_ms)).await;

        if !soft(locator.set_text(field, text).await)? {
            return Ok(false);
        }
        locator.settle(InputTimings::ms(self.timings.after_set_ms)).await;

        Ok(true)
    }

    fn kind(&self) -> InputStrategyKind {
        InputStrategyKind::EditLastCharacter
    }
}

/// Clear the field and append one character at a time.
pub struct DigitByDigitStrategy {
    timings: InputTimings,
}

impl DigitByDigitStrategy {
    pub fn new(timings: InputTimings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl InputStrategy for DigitByDigitStrategy {
    async fn apply(
        &self,
        locator: &ElementLocator,
        field: &Selector,
        text: &str,
    ) -> Result<bool, ActionError> {
        if !soft(locator.set_text(field, "").await)? {
            return Ok(false);
        }
        locator.settle(InputTimings::ms(self.timings.clear_settle_ms)).await;

        let mut typed = String::with_capacity(text.len());
        for ch in text.chars() {
            typed.push(ch);
            if !soft(locator.set_text(field, &typed).await)? {
                debug!(serial = %locator.serial(), typed = typed.len(), "Field vanished while typing");
                return Ok(false);
            }
            locator.settle(InputTimings::ms(self.timings.keystroke_gap_ms)).await;
        }
        locator.settle(InputTimings::ms(self.timings.final_settle_ms)).await;

        Ok(true)
    }

    fn kind(&self) -> InputStrategyKind {
        InputStrategyKind::DigitByDigit
    }
}
