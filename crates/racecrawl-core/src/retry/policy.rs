use std::time::Duration;

use crate::config::RetryConfig;

/// Decision for a failed page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resubmit the page with an incremented attempt counter.
    Requeue,
    /// Retry budget exhausted; record a terminal failure.
    GiveUp,
}

/// Retry budget and exponential backoff with caps.
///
/// `max_retry` counts resubmissions, so a page is attempted at most
/// `max_retry + 1` times.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retry: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retry: cfg.max_retry,
            base_delay: Duration::from_secs_f64(cfg.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Decide for a request that has already been attempted `attempt + 1`
    /// times (`attempt` is the resubmission counter, 0 = first attempt).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retry {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Requeue
        }
    }

    /// Backoff delay before re-fetching a resubmitted request.
    ///
    /// `attempt` is the resubmission ordinal (1 = first retry). Exponential
    /// in the attempt, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 1u32 << attempt.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}
