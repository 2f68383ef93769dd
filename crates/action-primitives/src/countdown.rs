//! Countdown timer parsing
//!
//! Resend controls and redirect banners show remaining time as `MM:SS` or
//! as a bare number of seconds. A countdown that cannot be read is
//! [`CountdownValue::Unknown`], which callers must keep distinct from zero:
//! zero means "safe to resend", Unknown means "no evidence either way".

use std::fmt;
use std::time::Duration;

use devflow_core_types::Selector;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::ActionError;
use crate::locator::ElementLocator;

static MINUTES_SECONDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+):(\d+)").unwrap());

/// Remaining time read from a countdown element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownValue {
    Remaining(Duration),
    Unknown,
}

impl CountdownValue {
    /// True only for a countdown that was read and shows zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, CountdownValue::Remaining(d) if d.is_zero())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CountdownValue::Unknown)
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            CountdownValue::Remaining(d) => Some(*d),
            CountdownValue::Unknown => None,
        }
    }
}

impl fmt::Display for CountdownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownValue::Remaining(d) => {
                let secs = d.as_secs();
                write!(f, "{:02}:{:02}", secs / 60, secs % 60)
            }
            CountdownValue::Unknown => f.write_str("unknown"),
        }
    }
}

pub struct CountdownTimer;

impl CountdownTimer {
    /// Parse `MM:SS` (anywhere in the text) or a bare seconds count.
    ///
    /// Values too large to represent are Unknown.
    pub fn parse(text: &str) -> CountdownValue {
        if let Some(caps) = MINUTES_SECONDS.captures(text) {
            let minutes = caps[1].parse::<u64>().ok();
            let seconds = caps[2].parse::<u64>().ok();
            let total = minutes
                .zip(seconds)
                .and_then(|(m, s)| m.checked_mul(60).and_then(|v| v.checked_add(s)));
            return match total {
                Some(secs) => CountdownValue::Remaining(Duration::from_secs(secs)),
                None => CountdownValue::Unknown,
            };
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(secs) = trimmed.parse::<u64>() {
                return CountdownValue::Remaining(Duration::from_secs(secs));
            }
        }

        CountdownValue::Unknown
    }

    /// Read and parse the countdown element; an absent element is Unknown.
    pub async fn read(
        locator: &ElementLocator,
        selector: &Selector,
    ) -> Result<CountdownValue, ActionError> {
        let value = match locator.resolve(selector).await? {
            Some(handle) => Self::parse(handle.text()),
            None => CountdownValue::Unknown,
        };

        if value.is_unknown() {
            debug!(serial = %locator.serial(), selector = %selector, "Countdown unreadable");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ui_bridge::{ElementSpec, Scenario, ScriptedDevice};

    fn secs(n: u64) -> CountdownValue {
        CountdownValue::Remaining(Duration::from_secs(n))
    }

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(CountdownTimer::parse("05:30"), secs(330));
        assert_eq!(CountdownTimer::parse("Resend in 01:05"), secs(65));
        assert_eq!(CountdownTimer::parse("00:00"), secs(0));
    }

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(CountdownTimer::parse("45"), secs(45));
        assert_eq!(CountdownTimer::parse(" 7 "), secs(7));
    }

    #[test]
    fn unparsable_text_is_unknown() {
        assert_eq!(CountdownTimer::parse("garbage"), CountdownValue::Unknown);
        assert_eq!(CountdownTimer::parse(""), CountdownValue::Unknown);
        assert_eq!(CountdownTimer::parse("45s"), CountdownValue::Unknown);
    }

    #[test]
    fn oversized_fields_are_unknown() {
        assert_eq!(
            CountdownTimer::parse("999999999999999999:00"),
            CountdownValue::Unknown
        );
        assert_eq!(
            CountdownTimer::parse("00:99999999999999999999"),
            CountdownValue::Unknown
        );
        assert_eq!(
            CountdownTimer::parse("99999999999999999999"),
            CountdownValue::Unknown
        );
        assert_eq!(CountdownTimer::parse("18446744073709551615"), secs(u64::MAX));
    }

    #[test]
    fn unknown_is_never_zero() {
        assert!(secs(0).is_zero());
        assert!(!CountdownValue::Unknown.is_zero());
        assert!(!secs(1).is_zero());
        assert_eq!(CountdownValue::Unknown.remaining(), None);
        assert_eq!(secs(330).to_string(), "05:30");
    }

    #[tokio::test]
    async fn read_treats_missing_element_as_unknown() {
        let scenario = Scenario::new("emulator-5554").with_element(
            ElementSpec::new("timer")
                .with_id("app:id/tvCountdown")
                .with_text("00:42"),
        );
        let device = Arc::new(ScriptedDevice::from_scenario(scenario).unwrap());
        let locator = ElementLocator::new(device);

        assert_eq!(
            CountdownTimer::read(&locator, &Selector::id("app:id/tvCountdown"))
                .await
                .unwrap(),
            secs(42)
        );
        assert_eq!(
            CountdownTimer::read(&locator, &Selector::id("app:id/tvTimer"))
                .await
                .unwrap(),
            CountdownValue::Unknown
        );
    }
}
