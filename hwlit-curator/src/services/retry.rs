//! Bounded retry with a fixed linear backoff
//!
//! Shared by the arXiv page fetch and the LLM call. Only errors the caller
//! classifies as transient are retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempts per call, first try included
pub const MAX_ATTEMPTS: u32 = 3;

/// Retry schedule: `base_delay × attempt` after each failed attempt
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, E, F, Fut, P>(&self, is_transient: P, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.max_attempts => {
                    let wait = self.delay_after(attempt);
                    tracing::warn!(error = %e, attempt, "Transient error; retrying in {:?}", wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
