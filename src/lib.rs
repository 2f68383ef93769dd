//! Devflow library
//!
//! Exposes the CLI and rehearsal runner for integration testing

pub mod cli;
pub mod rehearsal;

pub use rehearsal::{rehearse, Rehearsal, RehearsalError, RehearsalPlan, RehearsalReport};
