//! Retry policy: per-attempt deadline, attempt budget and backoff delays.

use std::time::Duration;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default number of attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Retry policy for one logical request.
///
/// Invariant: `max_attempts >= 1` (enforced by [`RetryPolicy::new`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,

    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each subsequent one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Same budget and backoff with a different per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Calculate the delay to wait after the given failed attempt.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = base_delay * 2^(attempts - 1)
    ///
    /// Example with base_delay=1s:
    /// - after attempt 1: 1s
    /// - after attempt 2: 2s
    /// - after attempt 3: 4s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
