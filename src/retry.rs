use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Exponential backoff without jitter: attempt `n` is followed by a sleep of
/// `base * 2^(n-1)` unless it was the last one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
    base: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay after the given 1-based attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(1u32 << exp)
    }

    /// Run `op` until it succeeds or attempts are exhausted, returning the last
    /// error. `on_error` sees every failure with its attempt number.
    pub async fn run<T, E, F, Fut, L>(&self, mut op: F, mut on_error: L) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        L: FnMut(u32, &E),
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_error(attempt, &e);
                    if attempt >= self.attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(self.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(cfg: RetryConfig) -> Self {
        let base = Duration::try_from_secs_f64(cfg.backoff_base).unwrap_or(Duration::ZERO);
        Self::new(cfg.attempts, base)
    }
}
