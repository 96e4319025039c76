//! Fixed-delay retry around pooled operation calls

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::pool::WorkerPool;
use super::result::FetchResult;
use crate::catalog::Operation;
use crate::error::{Error, Result};
use crate::types::Params;

/// Default attempts per fetch, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry policy. There is no backoff: every gap is `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` below one is raised to one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

/// Successful fetch
#[derive(Debug)]
pub struct Fetched {
    pub result: FetchResult,
    /// Attempts used, including the successful one
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Invokes operations on the worker pool under a retry policy
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    pool: WorkerPool,
    policy: RetryPolicy,
}

impl Fetcher {
    #[must_use]
    pub const fn new(pool: WorkerPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `operation` until it succeeds or the policy is exhausted.
    ///
    /// Every failure counts as transient here; callers resolve operation
    /// names before fetching so an unknown name never reaches this loop.
    ///
    /// # Errors
    ///
    /// Returns `Error::FetchFailed` carrying the last failure message.
    pub async fn fetch(
        &self,
        name: &str,
        operation: Arc<dyn Operation>,
        params: Arc<Params>,
    ) -> Result<Fetched> {
        let started = Instant::now();
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let op = Arc::clone(&operation);
            let args = Arc::clone(&params);
            let message = match self.pool.run(move || op.invoke(&args)).await {
                Ok(Ok(result)) => {
                    if attempt > 1 {
                        tracing::info!(operation = name, attempt, "Fetch succeeded after retry");
                    }
                    return Ok(Fetched {
                        result,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(e) => e.to_string(),
            };

            tracing::warn!(
                operation = name,
                attempt,
                max_attempts,
                error = %message,
                "Fetch attempt failed"
            );
            last_error = message;

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(Error::FetchFailed {
            operation: name.to_string(),
            attempts: max_attempts,
            message: last_error,
        })
    }
}
