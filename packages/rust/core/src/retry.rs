//! Bounded retry with linear backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use coursegen_shared::{FetchConfig, Result};

/// How many times a remote unit is attempted and how long to wait between
/// attempts. Retry `n` (1-based) waits `n * backoff_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_step: config.backoff_step,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// The error of the last attempt is returned unchanged. `unit` names the
    /// work in log output.
    pub async fn run<T, F, Fut>(&self, unit: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(unit, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        unit,
                        attempt,
                        error = %e,
                        retry_in_secs = delay.as_secs_f64(),
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
