//! Retry with exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How many attempts to make and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retry
    pub fn once() -> Self {
        Self {
            attempts: 1,
            base: Duration::ZERO,
        }
    }

    pub fn retries(&self) -> bool {
        self.attempts > 1
    }

    /// Wait before the attempt after `failed` (0-based): base * 2^failed
    pub fn delay_after(&self, failed: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(failed))
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted.
///
/// Every attempt is a fresh call of the closure. After the last failure the
/// error of that attempt is returned unchanged.
pub async fn fetch_with_retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut failed = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if failed + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_after(failed);
                warn!("{} attempt {} failed: {} (retrying in {:?})", what, failed + 1, e, delay);
                tokio::time::sleep(delay).await;
                failed += 1;
            }
        }
    }
}
