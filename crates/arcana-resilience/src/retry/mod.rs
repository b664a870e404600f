//! Reconnect backoff policy.

use std::time::Duration;
use tracing::debug;

/// Linear, capped reconnect backoff.
///
/// The delay before reconnect attempt `n` (1-based) is
/// `min(n * step, max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Delay added per attempt.
    pub step: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(50),
            max_delay: Duration::from_millis(2_000),
        }
    }
}

impl ReconnectBackoff {
    /// Creates a backoff policy with the given step and cap.
    #[must_use]
    pub const fn new(step: Duration, max_delay: Duration) -> Self {
        Self { step, max_delay }
    }

    /// Calculates the delay for a given attempt number.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_delay)
    }

    /// Sleeps for the delay of `attempt` and returns the delay used.
    pub async fn wait(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        debug!("Reconnect attempt {} after {:?}", attempt, delay);
        tokio::time::sleep(delay).await;
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_for_attempt_zero() {
        let backoff = ReconnectBackoff::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_delay_grows_linearly() {
        let backoff = ReconnectBackoff::default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let backoff = ReconnectBackoff::default();
        assert_eq!(backoff.delay_for_attempt(40), Duration::from_millis(2_000));
        assert_eq!(backoff.delay_for_attempt(41), Duration::from_millis(2_000));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_delay() {
        let backoff = ReconnectBackoff::new(Duration::from_millis(10), Duration::from_millis(25));
        let start = tokio::time::Instant::now();
        let delay = backoff.wait(3).await;
        assert_eq!(delay, Duration::from_millis(25));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
