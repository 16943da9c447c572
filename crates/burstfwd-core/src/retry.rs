//! Optional per-item retry with capped exponential backoff.
//!
//! Off by default: without a policy the first transfer failure fails the
//! job. When enabled, the job loop asks [`RetryPolicy::decide`] after each
//! failed attempt and performs the (interruptible) backoff wait itself.

use std::time::Duration;

use crate::transfer::ErrorKind;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Simple exponential backoff policy with caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`: `base * 2^(attempt-1)`, at most `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay)
    }

    /// What to do after attempt number `attempt` (1-based) failed with `kind`.
    ///
    /// A throttling hint from the destination is used as a floor and may
    /// exceed `max_delay`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        let delay = self.backoff(attempt);
        match kind {
            ErrorKind::Throttled {
                retry_after: Some(hint),
            } => RetryDecision::RetryAfter(delay.max(hint)),
            _ => RetryDecision::RetryAfter(delay),
        }
    }
}
