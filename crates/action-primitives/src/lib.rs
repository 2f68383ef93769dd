//! Action primitives for devflow
//!
//! This crate provides the building blocks the flows are made of:
//! - `ElementLocator`: snapshot lookups, bounded waits and tap/text primitives
//! - `CountdownTimer`: remaining-time parsing with an explicit Unknown state
//! - `Deadline`: fixed-interval polling that never overruns its timeout

pub mod countdown;
pub mod errors;
mod locator;
pub mod types;
mod waiting;

pub use countdown::{CountdownTimer, CountdownValue};
pub use errors::*;
pub use locator::*;
pub use types::*;
pub use waiting::*;
