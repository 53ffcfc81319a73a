// src/retry.rs
//
//! Injected retry capability: attempt an operation up to N times with
//! backoff, surfacing the last failure once the budget is spent.
//!
//! The policy is consumed, not owned, by the reader and writer paths; callers
//! may swap in their own pacing by implementing [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use crate::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};
use crate::error::Result;

/// Pacing decision for retrying transient store failures.
pub trait RetryPolicy: Send + Sync {
    /// Delay to wait before the next attempt, given the number of failures so
    /// far, or `None` once the attempt budget is exhausted.
    fn backoff(&self, failed_attempts: u32) -> Option<Duration>;
}

/// Bounded exponential backoff: `base * 2^(failures-1)`, capped at
/// `max_delay`, for at most `max_attempts` total attempts.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_ATTEMPTS,
            Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        )
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn backoff(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts >= self.max_attempts {
            return None;
        }
        let shift = failed_attempts.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        Some(delay.min(self.max_delay))
    }
}

/// Drive `op` until it succeeds, fails permanently, or the policy gives up.
/// Only `Transient` errors are retried; everything else surfaces immediately.
pub async fn retry_transient<T, F, Fut>(policy: &dyn RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                failures += 1;
                match policy.backoff(failures) {
                    Some(delay) => {
                        log::debug!("transient failure (attempt {failures}), retrying in {delay:?}: {e}");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_gives_up() {
        let policy = ExponentialBackoff::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.backoff(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.backoff(3), None);
    }

    #[test]
    fn backoff_is_capped() {
        let mut policy = ExponentialBackoff::new(32, Duration::from_millis(100));
        policy.max_delay = Duration::from_secs(1);
        assert_eq!(policy.backoff(10), Some(Duration::from_secs(1)));
    }
}
