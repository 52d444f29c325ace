//! Bounded retry with exponential backoff
//!
//! Used around calls to the remote inference API. Only errors the caller
//! classifies as transient are retried; anything else fails immediately.

use std::time::{Duration, Instant};

/// Attempt budget and backoff schedule
///
/// **Backoff Strategy:**
/// - Delay before retry `n` (1-based): `backoff_base * 2^(n-1)`
/// - Capped at `backoff_cap`
/// - Defaults: 3 attempts, 1s base, 10s cap (delays 1s, 2s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_cap)
    }
}

/// Final failure of a retried operation
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts actually made
    pub attempts: u32,
    /// True when the attempt budget ran out; false for a non-transient error
    pub exhausted: bool,
    pub last_error: E,
}

/// Run `operation` until it succeeds, fails permanently, or the budget runs out
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "model inference")
/// * `policy` - Attempt budget and backoff schedule
/// * `is_transient` - Classifies an error as worth retrying
/// * `operation` - Async closure performing one attempt
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_transient: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_transient(&err) {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Non-transient failure, not retrying"
                    );
                    return Err(RetryError {
                        attempts: attempt,
                        exhausted: false,
                        last_error: err,
                    });
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Operation failed: retry budget exhausted"
                    );
                    return Err(RetryError {
                        attempts: attempt,
                        exhausted: true,
                        last_error: err,
                    });
                }

                let backoff = policy.backoff_for(attempt);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}
