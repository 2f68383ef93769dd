//! Step failure handling

use tokio::time::Duration;
use tracing::{info, warn};

use crate::types::FailureStrategy;

/// Backoff never exceeds this.
const MAX_BACKOFF_MS: u64 = 60_000;

/// What to do after a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Stop the sequence
    Abort,

    /// Go on with the next step
    Continue,

    /// Run the step again after `backoff`
    Retry { attempt: u32, backoff: Duration },
}

/// Decide how to proceed after `attempt` (1-based) failed.
pub fn decide(step: &str, strategy: FailureStrategy, attempt: u32) -> FailureDecision {
    match strategy {
        FailureStrategy::Abort => {
            warn!(step, "Step failed; aborting sequence");
            FailureDecision::Abort
        }

        FailureStrategy::Continue => {
            warn!(step, "Step failed; continuing with next step");
            FailureDecision::Continue
        }

        FailureStrategy::Retry { max_attempts, .. } => {
            if attempt >= max_attempts {
                warn!(step, attempt, "Step failed on its last attempt; aborting");
                FailureDecision::Abort
            } else {
                let backoff = backoff(strategy, attempt);
                info!(
                    step,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Step failed; retrying"
                );
                FailureDecision::Retry {
                    attempt: attempt + 1,
                    backoff,
                }
            }
        }
    }
}

/// Exponential backoff: `backoff_ms * 2^(attempt-1)`, capped.
pub fn backoff(strategy: FailureStrategy, attempt: u32) -> Duration {
    match strategy {
        FailureStrategy::Retry { backoff_ms, .. } => {
            let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
            Duration::from_millis(backoff_ms.saturating_mul(multiplier).min(MAX_BACKOFF_MS))
        }
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETRY: FailureStrategy = FailureStrategy::Retry {
        max_attempts: 3,
        backoff_ms: 1000,
    };

    #[test]
    fn retry_until_attempts_run_out() {
        assert_eq!(
            decide("s", RETRY, 1),
            FailureDecision::Retry {
                attempt: 2,
                backoff: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            decide("s", RETRY, 2),
            FailureDecision::Retry {
                attempt: 3,
                backoff: Duration::from_millis(2000)
            }
        );
        assert_eq!(decide("s", RETRY, 3), FailureDecision::Abort);
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff(RETRY, 10), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff(FailureStrategy::Abort, 3), Duration::ZERO);
    }

    #[test]
    fn abort_and_continue_are_immediate() {
        assert_eq!(decide("s", FailureStrategy::Abort, 1), FailureDecision::Abort);
        assert_eq!(
            decide("s", FailureStrategy::Continue, 1),
            FailureDecision::Continue
        );
    }
}
