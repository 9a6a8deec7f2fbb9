//! Attempt budget and exponential backoff for render jobs.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::RenderError;

/// Retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Attempt budget; never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after attempt `attempt` (0-indexed) has failed.
    pub fn delay_after_failure(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(delay as u64)
    }

    /// Wait before attempt `attempt` (0-indexed). The first attempt starts
    /// immediately.
    pub fn backoff(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self.delay_after_failure(n - 1),
        }
    }
}

/// Run `operation` until it succeeds, the budget is spent, or it fails with
/// an error that another attempt cannot fix.
///
/// The closure receives the 0-indexed attempt number. The last error is
/// returned unmodified.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RenderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RenderError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        let delay = policy.backoff(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}/{}", label, attempt + 1, attempts);
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= attempts {
                    return Err(e);
                }
                warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    label,
                    attempt + 1,
                    attempts,
                    e,
                    policy.backoff(attempt + 1)
                );
                attempt += 1;
            }
        }
    }
}
