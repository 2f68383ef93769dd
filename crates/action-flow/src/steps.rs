//! Generic step sequencer
//!
//! Runs a list of [`FlowStep`]s in order with an opportunistic popup check
//! before each one. A failed step is handed to the failure strategy of
//! that step.

use std::time::Duration;

use action_input::InputTarget;
use action_primitives::{ActionError, Deadline};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ms;
use crate::engine::FlowEngine;
use crate::errors::FlowError;
use crate::strategies::{decide, FailureDecision};
use crate::types::{FlowContext, FlowStep, StepAction, StepPredicate};

impl FlowEngine {
    /// Run `steps` in order; false as soon as a step aborts the sequence.
    pub async fn run_steps(&self, steps: &[FlowStep]) -> Result<bool, FlowError> {
        let mut ctx = FlowContext::new(self.serial().clone(), "steps", 0);
        let span = info_span!(
            "step_flow",
            serial = %ctx.serial,
            run_id = %ctx.run_id,
            steps = steps.len()
        );

        let outcome = self.sequence(&mut ctx, steps).instrument(span).await;
        self.store_context(ctx, &outcome);
        outcome
    }

    async fn sequence(&self, ctx: &mut FlowContext, steps: &[FlowStep]) -> Result<bool, FlowError> {
        for step in steps {
            let mut attempt = 1;
            loop {
                if !self.popups.handle(None).await? {
                    debug!(step = %step.name, "Popup stayed up; trying the step anyway");
                }

                if self.run_step(step).await? {
                    info!(step = %step.name, action = step.action.name(), attempt, "Step done");
                    break;
                }

                ctx.step_failures += 1;
                match decide(&step.name, step.on_failure, attempt) {
                    FailureDecision::Abort => return Ok(false),
                    FailureDecision::Continue => break,
                    FailureDecision::Retry { attempt: next, backoff } => {
                        self.locator.settle(backoff).await;
                        attempt = next;
                    }
                }
            }
        }
        Ok(true)
    }

    async fn run_step(&self, step: &FlowStep) -> Result<bool, FlowError> {
        let timeout = ms(step.timeout_ms);

        let acted = match &step.action {
            StepAction::Locate => self.locator.exists(&step.target).await?,
            StepAction::Click => match self.locator.click(&step.target).await {
                Ok(()) => true,
                Err(err) if err.is_not_found() => false,
                Err(err) => return Err(err.into()),
            },
            StepAction::Input { text } => {
                // An `enabled` predicate doubles as the input verification
                let verify = match &step.success {
                    Some(StepPredicate::Enabled(selector)) => Some(selector),
                    _ => None,
                };
                let target = InputTarget::field(step.target.clone());
                self.input.input(&target, text, verify).await?.success
            }
            StepAction::Wait => self.locator.wait_for(&step.target, timeout).await?,
        };

        if !acted {
            warn!(step = %step.name, target = %step.target, "Step action failed");
            return Ok(false);
        }

        match &step.success {
            None => Ok(true),
            Some(predicate) => self.await_predicate(&step.name, predicate, timeout).await,
        }
    }

    async fn await_predicate(
        &self,
        step: &str,
        predicate: &StepPredicate,
        timeout: Duration,
    ) -> Result<bool, FlowError> {
        let deadline = Deadline::after(timeout, self.locator.poll_interval());
        loop {
            if self.check_predicate(predicate).await? {
                return Ok(true);
            }
            if !deadline.tick().await {
                warn!(step, ?predicate, "Step condition not met in time");
                return Ok(false);
            }
        }
    }

    async fn check_predicate(&self, predicate: &StepPredicate) -> Result<bool, ActionError> {
        Ok(match predicate {
            StepPredicate::Visible(selector) => self.locator.exists(selector).await?,
            StepPredicate::Gone(selector) => !self.locator.exists(selector).await?,
            StepPredicate::Enabled(selector) => self.locator.is_enabled(selector).await?,
            StepPredicate::TextContains { target, text } => self
                .locator
                .resolve(target)
                .await?
                .map(|handle| handle.text().contains(text.as_str()))
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use devflow_core_types::Selector;
    use tokio::time::Instant;
    use ui_bridge::{Effect, ElementSpec, Reaction, Scenario, ScriptedDevice, Trigger};

    use super::*;
    use crate::config::EngineConfig;
    use crate::types::FailureStrategy;

    fn settings_screen() -> Arc<ScriptedDevice> {
        let scenario = Scenario::new("steps-1")
            .with_element(ElementSpec::new("menu").with_id("app:id/menu"))
            .with_element(ElementSpec::new("panel").with_id("app:id/panel").hidden())
            .with_element(
                ElementSpec::new("name")
                    .with_id("app:id/name")
                    .with_class("android.widget.EditText"),
            )
            .with_element(ElementSpec::new("save").with_id("app:id/save").disabled())
            .with_reaction(Reaction::new(
                Trigger::Tap("menu".into()),
                vec![Effect::Show("panel".into())],
            ))
            .with_reaction(Reaction::new(
                Trigger::TextEquals {
                    target: "name".into(),
                    value: "devflow".into(),
                },
                vec![Effect::Enable("save".into())],
            ));
        Arc::new(ScriptedDevice::from_scenario(scenario).unwrap())
    }

    fn engine(device: Arc<ScriptedDevice>) -> FlowEngine {
        FlowEngine::new(device, Arc::new(EngineConfig::default())).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn steps_run_in_order_with_predicates() {
        let device = settings_screen();
        let engine = engine(device.clone());

        let steps = vec![
            FlowStep::new("open menu", StepAction::Click, Selector::id("app:id/menu"))
                .expect(StepPredicate::Visible(Selector::id("app:id/panel"))),
            FlowStep::new(
                "type name",
                StepAction::Input {
                    text: "devflow".into(),
                },
                Selector::id("app:id/name"),
            )
            .expect(StepPredicate::Enabled(Selector::id("app:id/save"))),
            FlowStep::new("save", StepAction::Click, Selector::id("app:id/save")),
        ];

        assert!(engine.run_steps(&steps).await.unwrap());
        assert_eq!(device.tap_count("save"), 1);
        assert_eq!(device.text_of("name").as_deref(), Some("devflow"));
        assert_eq!(engine.last_context().unwrap().step_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_the_sequence() {
        let device = settings_screen();
        let engine = engine(device.clone());

        let steps = vec![
            FlowStep::new("missing", StepAction::Click, Selector::id("app:id/ghost")),
            FlowStep::new("open menu", StepAction::Click, Selector::id("app:id/menu")),
        ];

        assert!(!engine.run_steps(&steps).await.unwrap());
        assert_eq!(device.tap_count("menu"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_skips_to_next_step() {
        let device = settings_screen();
        let engine = engine(device.clone());

        let steps = vec![
            FlowStep::new("missing", StepAction::Locate, Selector::id("app:id/ghost"))
                .on_failure(FailureStrategy::Continue),
            FlowStep::new("open menu", StepAction::Click, Selector::id("app:id/menu")),
        ];

        assert!(engine.run_steps(&steps).await.unwrap());
        assert_eq!(device.tap_count("menu"), 1);
        assert_eq!(engine.last_context().unwrap().step_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backs_off_between_attempts() {
        let device = settings_screen();
        let engine = engine(device.clone());

        let steps = vec![FlowStep::new(
            "panel",
            StepAction::Locate,
            Selector::id("app:id/panel"),
        )
        .on_failure(FailureStrategy::Retry {
            max_attempts: 3,
            backoff_ms: 1000,
        })];

        let started = Instant::now();
        assert!(!engine.run_steps(&steps).await.unwrap());
        // 1s + 2s of backoff before the third and last attempt
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert_eq!(engine.last_context().unwrap().step_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_step_times_out() {
        let device = settings_screen();
        let engine = engine(device);

        let steps = vec![
            FlowStep::new("panel", StepAction::Wait, Selector::id("app:id/panel")).with_timeout(2000),
        ];

        let started = Instant::now();
        assert!(!engine.run_steps(&steps).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }
}
