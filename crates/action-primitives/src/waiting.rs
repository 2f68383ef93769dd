//! Bounded polling

use std::time::Duration;

use tokio::time::Instant;

/// Default interval between two snapshot checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// A fixed deadline polled at a fixed interval.
///
/// ```ignore
/// let deadline = Deadline::after(timeout, interval);
/// loop {
///     if check().await? { return Ok(true); }
///     if !deadline.tick().await { return Ok(false); }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    end: Instant,
    interval: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration, interval: Duration) -> Self {
        Self {
            end: Instant::now() + timeout,
            interval,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.end
    }

    pub fn remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }

    /// Sleep one interval, clipped to the deadline.
    ///
    /// Returns false without sleeping once the deadline has passed, so the
    /// caller gets one last check exactly at the deadline.
    pub async fn tick(&self) -> bool {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return false;
        }
        tokio::time::sleep(remaining.min(self.interval)).await;
        true
    }
}
