//! Flow Orchestration Layer
//!
//! Login and OTP flows for one device session, built from the element
//! locator, the input strategy resolver and the popup interceptor. A
//! [`FlowEngine`] is constructed per device from an [`EngineConfig`]; each
//! flow returns a single boolean and leaves its [`FlowContext`] behind for
//! inspection.

pub mod classify;
pub mod config;
mod engine;
pub mod errors;
mod login;
mod otp;
mod steps;
pub mod strategies;
pub mod types;

pub use classify::{builtin_patterns, classify_with, MessageClassification, MessagePattern};
pub use config::{EngineConfig, FlowTimings, LoginSelectors, OtpSelectors};
pub use engine::FlowEngine;
pub use errors::FlowError;
pub use strategies::{decide, FailureDecision};
pub use types::{
    FailureStrategy, FlowContext, FlowState, FlowStep, LoginState, OtpState, ResendOutcome,
    StepAction, StepPredicate,
};
