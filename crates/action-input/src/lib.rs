//! Text entry with ordered fallback strategies
//!
//! Many host fields only run their client-side validation (enabling a
//! Continue or Verify button) for particular input-event patterns. The
//! resolver tries three strategies in order and stops at the first one
//! after which the verification control is enabled:
//! 1. Direct - set the full text, then tap elsewhere to blur the field
//! 2. Edit-last-character - drop the final character and restore it
//! 3. Digit-by-digit - clear the field and append one character at a time

mod resolver;
mod strategies;
pub mod types;

pub use resolver::InputStrategyResolver;
pub use strategies::{DigitByDigitStrategy, DirectStrategy, EditLastCharacterStrategy, InputStrategy};
pub use types::{InputOutcome, InputStrategyKind, InputTarget, InputTimings, StrategyAttempt};
