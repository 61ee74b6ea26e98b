//! Bounded exponential backoff for calls to the fingerprinting service.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Cap for exponential growth.
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry_count` (0-based):
    /// `initial_backoff * multiplier^retry_count`, capped at `max_backoff`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let millis = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(retry_count as i32);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn should_retry(&self, retryable: bool, retry_count: u32) -> bool {
        retryable && retry_count < self.max_retries
    }

    /// Worst case for a whole retry sequence: every attempt runs into
    /// `attempt_timeout`, plus the backoff sleeps between attempts.
    pub fn total_budget(&self, attempt_timeout: Duration) -> Duration {
        let backoffs: Duration = (0..self.max_retries).map(|i| self.backoff(i)).sum();
        attempt_timeout * (self.max_retries + 1) + backoffs
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}
