use std::time::Duration;

use crate::error::SourceError;

/// Exponential backoff for message source fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
    max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try, so `1` disables retries.
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(0, 0, 1)
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (zero based), honoring a server hint.
    pub fn delay_for_attempt(&self, attempt: u32, retry_after_hint_ms: Option<u64>) -> Duration {
        let multiplier = 1_u64 << attempt.min(20);
        let calculated = self.base_delay_ms.saturating_mul(multiplier);
        let hinted = retry_after_hint_ms.unwrap_or(0);
        Duration::from_millis(calculated.max(hinted).min(self.max_delay_ms))
    }

    /// Delay before the next try after `failed_attempts` failures, or `None` to give up.
    pub fn next_delay(&self, failed_attempts: u32, error: &SourceError) -> Option<Duration> {
        if !error.is_recoverable() || failed_attempts >= self.max_attempts {
            return None;
        }
        Some(self.delay_for_attempt(failed_attempts.saturating_sub(1), error.retry_after_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(500, 30_000, 4)
    }
}
