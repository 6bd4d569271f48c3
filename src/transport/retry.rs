//! Retry policy for transport calls

use super::error::ErrorKind;
use std::time::Duration;

pub const MAX_RETRIES: u32 = 3;
pub const BASE_DELAY: Duration = Duration::from_secs(1);

/// Bounded exponential backoff.
///
/// `max_attempts` counts every try, including the first one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retry_on: fn(ErrorKind) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_delay: BASE_DELAY,
            retry_on: ErrorKind::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// One attempt, no backoff
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    ///
    /// Returns `None` when `attempt` was the last allowed try.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }

    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> bool {
        (self.retry_on)(kind) && attempt < self.max_attempts
    }
}
