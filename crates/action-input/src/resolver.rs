//! Input resolver with fallback chain orchestration

use std::sync::Arc;

use action_primitives::{ActionError, ElementLocator};
use devflow_core_types::Selector;
use tracing::{debug, info, warn};

use crate::strategies::{
    DigitByDigitStrategy, DirectStrategy, EditLastCharacterStrategy, InputStrategy,
};
use crate::types::{InputOutcome, InputTarget, InputTimings, StrategyAttempt};

/// Applies input strategies in order until the host app accepts the text.
pub struct InputStrategyResolver {
    locator: ElementLocator,
    strategies: Vec<Arc<dyn InputStrategy>>,
    timings: InputTimings,
}

impl InputStrategyResolver {
    /// Create a resolver with the default Direct, Edit-last, Digit-by-digit chain
    pub fn new(locator: ElementLocator, timings: InputTimings) -> Self {
        let strategies: Vec<Arc<dyn InputStrategy>> = vec![
            Arc::new(DirectStrategy::new(timings.clone())),
            Arc::new(EditLastCharacterStrategy::new(timings.clone())),
            Arc::new(DigitByDigitStrategy::new(timings.clone())),
        ];
        Self {
            locator,
            strategies,
            timings,
        }
    }

    /// Replace the strategy chain
    pub fn with_strategies(mut self, strategies: Vec<Arc<dyn InputStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Enter `text` into the target field.
    ///
    /// With a `verify` selector, a strategy only counts once that control is
    /// present and enabled. Without one, the first strategy that completes
    /// is accepted, which in practice is Direct.
    pub async fn input(
        &self,
        target: &InputTarget,
        text: &str,
        verify: Option<&Selector>,
    ) -> Result<InputOutcome, ActionError> {
        let serial = self.locator.serial().clone();

        // 1. Focus the field container
        if let Some(focus) = &target.focus {
            match self.locator.click(focus).await {
                Ok(()) => {
                    self.locator
                        .settle(InputTimings::ms(self.timings.focus_settle_ms))
                        .await
                }
                Err(err) if err.is_not_found() => {
                    warn!(%serial, focus = %focus, "Input container not found");
                    return Ok(InputOutcome::failed(Vec::new()));
                }
                Err(err) => return Err(err),
            }
        }

        // 2. Locate the editable field
        let field_timeout = InputTimings::ms(self.timings.field_timeout_ms);
        if !self.locator.wait_for(&target.field, field_timeout).await? {
            warn!(%serial, field = %target.field, "Editable field not found");
            return Ok(InputOutcome::failed(Vec::new()));
        }

        // 3. Walk the strategy chain
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            debug!(%serial, strategy = strategy.name(), "Trying input strategy");

            let applied = strategy.apply(&self.locator, &target.field, text).await?;
            let verified = if !applied {
                false
            } else {
                match verify {
                    Some(selector) => self.locator.is_enabled(selector).await?,
                    None => true,
                }
            };

            attempts.push(StrategyAttempt {
                strategy: strategy.kind(),
                applied,
                verified,
            });

            if verified {
                info!(
                    %serial,
                    strategy = strategy.name(),
                    attempts = attempts.len(),
                    "Input accepted"
                );
                return Ok(InputOutcome {
                    success: true,
                    strategy: Some(strategy.kind()),
                    attempts,
                });
            }

            debug!(%serial, strategy = strategy.name(), applied, "Input strategy did not take");
        }

        warn!(
            %serial,
            field = %target.field,
            "All input strategies exhausted without triggering validation"
        );
        Ok(InputOutcome::failed(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputStrategyKind;
    use std::time::Duration;
    use tokio::time::Instant;
    use ui_bridge::{Effect, ElementSpec, Reaction, Scenario, ScriptedDevice, Trigger};

    const FIELD_CLASS: &str = "android.widget.EditText";

    fn screen(trigger: Option<Trigger>) -> Arc<ScriptedDevice> {
        let mut scenario = Scenario::new("emulator-5554")
            .with_element(ElementSpec::new("container").with_id("app:id/tilMobileNumber"))
            .with_element(ElementSpec::new("field").with_class(FIELD_CLASS))
            .with_element(
                ElementSpec::new("continue")
                    .with_id("app:id/btnContinue")
                    .disabled(),
            );
        if let Some(trigger) = trigger {
            scenario = scenario.with_reaction(Reaction::new(
                trigger,
                vec![Effect::Enable("continue".into())],
            ));
        }
        Arc::new(ScriptedDevice::from_scenario(scenario).unwrap())
    }

    fn resolver(device: &Arc<ScriptedDevice>) -> InputStrategyResolver {
        InputStrategyResolver::new(ElementLocator::new(device.clone()), InputTimings::default())
    }

    fn target() -> InputTarget {
        InputTarget::field(Selector::class(FIELD_CLASS))
            .with_focus(Selector::id("app:id/tilMobileNumber"))
    }

    fn kinds(outcome: &InputOutcome) -> Vec<InputStrategyKind> {
        outcome.attempts.iter().map(|a| a.strategy).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn direct_strategy_wins_when_set_text_validates() {
        let device = screen(Some(Trigger::TextEquals {
            target: "field".into(),
            value: "081234567890".into(),
        }));
        let verify = Selector::id("app:id/btnContinue");

        let outcome = resolver(&device)
            .input(&target(), "081234567890", Some(&verify))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.strategy, Some(InputStrategyKind::Direct));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(device.tap_count("container"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn digit_by_digit_runs_after_earlier_strategies_fail() {
        let device = screen(Some(Trigger::Typed {
            target: "field".into(),
            value: "0812".into(),
        }));
        let verify = Selector::id("app:id/btnContinue");

        let outcome = resolver(&device)
            .input(&target(), "0812", Some(&verify))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.strategy, Some(InputStrategyKind::DigitByDigit));
        assert_eq!(kinds(&outcome), InputStrategyKind::fallback_chain());
        assert!(outcome.attempts[..2].iter().all(|a| a.applied && !a.verified));
        assert_eq!(
            device.text_history("field"),
            vec!["0812", "081", "0812", "", "0", "08", "081", "0812"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn edit_last_character_triggers_change_event() {
        let device = screen(Some(Trigger::TextEquals {
            target: "field".into(),
            value: "081".into(),
        }));
        let verify = Selector::id("app:id/btnContinue");

        let outcome = resolver(&device)
            .input(&target(), "0812", Some(&verify))
            .await
            .unwrap();

        assert_eq!(outcome.strategy, Some(InputStrategyKind::EditLastCharacter));
        assert_eq!(device.text_of("field").as_deref(), Some("0812"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_strategies_report_failure() {
        let device = screen(None);
        let verify = Selector::id("app:id/btnContinue");

        let outcome = resolver(&device)
            .input(&target(), "0812", Some(&verify))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.strategy, None);
        assert_eq!(outcome.attempts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn without_verification_direct_is_accepted() {
        let device = screen(None);
        let start = Instant::now();

        let outcome = resolver(&device)
            .input(&InputTarget::field(Selector::class(FIELD_CLASS)), "123456", None)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.strategy, Some(InputStrategyKind::Direct));
        // after-set plus after-blur settle
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_field_fails_without_strategies() {
        let device = screen(None);
        let outcome = resolver(&device)
            .input(&InputTarget::field(Selector::id("app:id/ghost")), "1", None)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.attempts.is_empty());
    }
}
