//! Bounded retry with exponential backoff for listing requests

use crate::config::ListingConfig;
use std::time::Duration;

/// How often, and how patiently, a listing page is re-requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_backoff: Duration,

    /// Ceiling for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ListingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A policy that retries without waiting
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Doubles per attempt starting at `initial_backoff`, capped at `max_backoff`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }

    /// True if another attempt is allowed after `attempt` failures
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}
