//! Exponential backoff for retrying a push or fetch against an alternate
//! endpoint.

use std::time::Duration;

/// An exponential backoff schedule with a cap, matching the producer's
/// `retry_wait`-style sleep between attempts against the same peer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy doubling `base_delay` on each attempt up to
    /// `max_delay`, giving up after `max_attempts`.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// The maximum number of attempts this policy allows.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns `true` if another attempt is permitted after `attempt`
    /// (zero-indexed) has failed.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// The delay to sleep before attempt number `attempt` (zero-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    /// Three attempts, starting at 100ms and capping at 2s.
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(2), 3)
    }
}
