//! Core types for flow orchestration

use std::fmt;

use chrono::{DateTime, Utc};
use devflow_core_types::{DeviceSerial, RunId, Selector};
use serde::{Deserialize, Serialize};

use crate::classify::MessageClassification;

/// Login checkpoints, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    AppOpen,
    AccountTabSelected,
    PhoneEntered,
    ContinuePressed,
    LoginVerified,
    Failed,
}

/// OTP checkpoints. The countdown/resend pair may repeat within the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    OtpPageVerified,
    CountdownChecked,
    ResendAttempted,
    CodeEntered,
    VerifySubmitted,
    Classified,
    HomeVerified,
    Failed,
}

/// A state a flow passed through, for context inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowState {
    Login(LoginState),
    Otp(OtpState),
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Login(state) => write!(f, "{:?}", state),
            FlowState::Otp(state) => write!(f, "{:?}", state),
        }
    }
}

impl From<LoginState> for FlowState {
    fn from(state: LoginState) -> Self {
        FlowState::Login(state)
    }
}

impl From<OtpState> for FlowState {
    fn from(state: OtpState) -> Self {
        FlowState::Otp(state)
    }
}

/// What a resend attempt amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResendOutcome {
    /// Tapped, and the countdown restarted
    Confirmed,
    /// Tapped, but the countdown gave no evidence it worked
    Unconfirmed,
    /// Not tapped: countdown running or unreadable, or no usable control
    Refused,
}

impl ResendOutcome {
    /// Whether the resend control was actually tapped
    pub fn tapped(&self) -> bool {
        !matches!(self, ResendOutcome::Refused)
    }
}

/// Mutable state of one flow execution.
///
/// Created at flow start, owned by that execution and dropped (or handed
/// to the caller for inspection) when it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowContext {
    pub serial: DeviceSerial,
    pub run_id: RunId,
    pub flow: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Resend taps made so far
    pub resend_count: u32,
    pub max_resend: u32,

    /// Verify taps made so far
    pub submissions: u32,

    /// Steps that failed without ending the flow
    pub step_failures: u32,

    pub last_classification: Option<MessageClassification>,
    pub resend_outcomes: Vec<ResendOutcome>,
    pub states: Vec<FlowState>,

    /// Final outcome, once known
    pub success: Option<bool>,
}

impl FlowContext {
    pub fn new(serial: DeviceSerial, flow: impl Into<String>, max_resend: u32) -> Self {
        Self {
            serial,
            run_id: RunId::new(),
            flow: flow.into(),
            started_at: Utc::now(),
            finished_at: None,
            resend_count: 0,
            max_resend,
            submissions: 0,
            step_failures: 0,
            last_classification: None,
            resend_outcomes: Vec::new(),
            states: Vec::new(),
            success: None,
        }
    }

    pub fn resend_budget_left(&self) -> bool {
        self.resend_count < self.max_resend
    }

    /// Submissions allowed in total: the first one plus one per resend.
    pub fn max_submissions(&self) -> u32 {
        self.max_resend.saturating_add(1)
    }

    pub fn enter(&mut self, state: impl Into<FlowState>) {
        self.states.push(state.into());
    }

    pub fn last_state(&self) -> Option<FlowState> {
        self.states.last().copied()
    }

    pub fn visited(&self, state: impl Into<FlowState>) -> bool {
        let state = state.into();
        self.states.contains(&state)
    }

    pub fn record_resend(&mut self, outcome: ResendOutcome) {
        if outcome.tapped() {
            self.resend_count += 1;
        }
        self.resend_outcomes.push(outcome);
    }

    pub fn finish(&mut self, success: bool) {
        self.success = Some(success);
        self.finished_at = Some(Utc::now());
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
    }
}

/// What a step does with its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Single existence check
    Locate,
    Click,
    Input { text: String },
    /// Bounded wait for the target to appear
    Wait,
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Locate => "locate",
            StepAction::Click => "click",
            StepAction::Input { .. } => "input",
            StepAction::Wait => "wait",
        }
    }
}

/// Condition that must hold after a step's action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPredicate {
    Visible(Selector),
    Gone(Selector),
    Enabled(Selector),
    TextContains { target: Selector, text: String },
}

/// How the sequencer reacts to a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Abort the sequence
    #[default]
    Abort,

    /// Log and move on to the next step
    Continue,

    /// Retry with exponential backoff
    Retry { max_attempts: u32, backoff_ms: u64 },
}

fn default_step_timeout_ms() -> u64 {
    5000
}

/// Immutable description of one UI step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub name: String,
    pub action: StepAction,
    pub target: Selector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<StepPredicate>,

    /// Bound for `wait` actions and for the success predicate
    #[serde(default = "default_step_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub on_failure: FailureStrategy,
}

impl FlowStep {
    pub fn new(name: impl Into<String>, action: StepAction, target: Selector) -> Self {
        Self {
            name: name.into(),
            action,
            target,
            success: None,
            timeout_ms: default_step_timeout_ms(),
            on_failure: FailureStrategy::Abort,
        }
    }

    pub fn expect(mut self, predicate: StepPredicate) -> Self {
        self.success = Some(predicate);
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn on_failure(mut self, strategy: FailureStrategy) -> Self {
        self.on_failure = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resend_budget_and_submission_cap() {
        let mut ctx = FlowContext::new(DeviceSerial::new("s1"), "otp", 1);
        assert!(ctx.resend_budget_left());
        assert_eq!(ctx.max_submissions(), 2);

        ctx.record_resend(ResendOutcome::Refused);
        assert!(ctx.resend_budget_left());

        ctx.record_resend(ResendOutcome::Unconfirmed);
        assert!(!ctx.resend_budget_left());
        assert_eq!(ctx.resend_outcomes.len(), 2);
    }

    #[test]
    fn states_are_recorded_in_order() {
        let mut ctx = FlowContext::new(DeviceSerial::new("s1"), "login", 0);
        ctx.enter(LoginState::AppOpen);
        ctx.enter(LoginState::AccountTabSelected);

        assert!(ctx.visited(LoginState::AppOpen));
        assert!(!ctx.visited(OtpState::HomeVerified));
        assert_eq!(
            ctx.last_state(),
            Some(FlowState::Login(LoginState::AccountTabSelected))
        );

        ctx.finish(true);
        assert!(ctx.latency_ms().is_some());
    }

    #[test]
    fn steps_deserialize_with_defaults() {
        let raw = r#"
- name: open account
  action: click
  target: { resource_id: "app:id/navigation_account" }
  success: { visible: { resource_id: "app:id/clLogin" } }
- name: type phone
  action: { input: { text: "0812" } }
  target: { class_name: "android.widget.EditText" }
  on_failure: { retry: { max_attempts: 3, backoff_ms: 200 } }
"#;
        let steps: Vec<FlowStep> = serde_yaml::from_str(raw).unwrap();
        assert_eq!(steps[0].timeout_ms, 5000);
        assert_eq!(steps[0].on_failure, FailureStrategy::Abort);
        assert_eq!(
            steps[1].action,
            StepAction::Input {
                text: "0812".into()
            }
        );
        assert!(matches!(
            steps[1].on_failure,
            FailureStrategy::Retry { max_attempts: 3, .. }
        ));
    }
}
