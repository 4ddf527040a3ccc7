//! Bounded retry with jittered exponential backoff.

use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy applied to each network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the first retry, before jitter.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
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
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// A provider `Retry-After` wins over the computed backoff; both are
    /// capped at `max_delay`. The computed backoff is `base * 2^(attempt-1)`
    /// with half of it randomized.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(requested) = retry_after {
            return requested.min(self.max_delay);
        }

        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let half = backoff / 2;
        let half_ms = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
        let jitter = if half_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=half_ms)
        };

        half + Duration::from_millis(jitter)
    }

    /// Runs an idempotent `call` until it succeeds, fails permanently, runs
    /// out of attempts or `cancel` fires.
    ///
    /// Every [`Error::is_transient`] failure is retried. Cancellation is
    /// observed before each attempt, while the call is in flight and during
    /// backoff sleeps.
    ///
    /// # Errors
    ///
    /// Returns the last error, or `Error::Cancelled`.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(cancel, operation, Error::is_transient, call).await
    }

    /// Like [`RetryPolicy::execute`] for a call that must take effect at
    /// most once, such as sending a message or adding an attachment.
    ///
    /// Only failures that prove the request was not processed
    /// ([`Error::is_safe_to_resend`]) are retried.
    ///
    /// # Errors
    ///
    /// Returns the last error, or `Error::Cancelled`.
    pub async fn execute_unrepeatable<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(cancel, operation, Error::is_safe_to_resend, call).await
    }

    async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        retryable: fn(&Error) -> bool,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = call() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) && attempt < max_attempts => {
                    let delay = self.delay_for(attempt, err.retry_after());
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => {
                    debug!(operation, attempt, error = %err, "call failed");
                    return Err(err);
                }
            }
        }
    }
}
