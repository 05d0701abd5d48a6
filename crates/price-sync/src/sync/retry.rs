//! Retry policy with capped exponential backoff.

use std::time::Duration;

use crate::errors::{FetchError, RetryClass};

/// Decides, per attempt, whether a failed call should be retried and
/// how long to wait first.
///
/// The policy is a pure decision function: it never sleeps and never
/// errors. Exhausting attempts simply returns `None`, which the chain
/// turns into fallback or a terminal outcome.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide whether to retry after `attempt` completed attempts
    /// (1-based) failed with `error`.
    ///
    /// Returns the backoff to sleep before the next attempt, or `None`
    /// to stop: terminal errors are never retried, and the budget is
    /// `max_attempts` calls per source. The delay doubles per attempt
    /// from the base, capped at the maximum; a provider-supplied
    /// rate-limit hint overrides the computed backoff.
    pub fn should_retry(&self, attempt: u32, error: &FetchError) -> Option<Duration> {
        if error.retry_class() == RetryClass::Terminal {
            return None;
        }
        if attempt >= self.max_attempts {
            return None;
        }

        if let Some(hint) = error.retry_after() {
            return Some(hint);
        }

        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        Some(delay.min(self.max_delay))
    }
}
