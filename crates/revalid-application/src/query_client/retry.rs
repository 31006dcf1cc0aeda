//! Retry, timeout and cancellation around caller-supplied functions

use revalid_domain::error::{Error, Result};
use revalid_domain::value_objects::{MutationOptions, QueryOptions};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How often and how long a caller-supplied function may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) retry_count: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) timeout: Option<Duration>,
}

impl RetryPolicy {
    pub(crate) fn once(timeout: Option<Duration>) -> Self {
        Self {
            retry_count: 0,
            retry_delay: Duration::ZERO,
            timeout,
        }
    }
}

impl From<&QueryOptions> for RetryPolicy {
    fn from(options: &QueryOptions) -> Self {
        Self {
            retry_count: options.retry_count,
            retry_delay: options.retry_delay,
            timeout: options.timeout,
        }
    }
}

impl From<&MutationOptions> for RetryPolicy {
    fn from(options: &MutationOptions) -> Self {
        Self {
            retry_count: options.retry_count,
            retry_delay: options.retry_delay,
            timeout: options.timeout,
        }
    }
}

/// Fail with `Cancelled` if `ct` has fired
pub(crate) fn ensure_not_cancelled(ct: &CancellationToken, operation: &str) -> Result<()> {
    if ct.is_cancelled() {
        Err(Error::cancelled(operation))
    } else {
        Ok(())
    }
}

/// Run `future` unless `ct` fires first
pub(crate) async fn cancellable<T, Fut>(
    ct: &CancellationToken,
    operation: &str,
    future: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = ct.cancelled() => Err(Error::cancelled(operation)),
        result = future => result,
    }
}

/// Run `f` with retries, a per-attempt timeout and cancellation
///
/// Cancellation is never retried.
pub(crate) async fn run_with_retry<T, F, Fut>(
    operation: &str,
    f: &F,
    policy: RetryPolicy,
    ct: &CancellationToken,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = cancellable(ct, operation, run_attempt(operation, f(), policy.timeout)).await;
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_cancelled() || attempt >= policy.retry_count => return Err(e),
            Err(e) => {
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_retries = policy.retry_count,
                    error = %e,
                    "Attempt failed, retrying"
                );
                cancellable(ct, operation, async {
                    tokio::time::sleep(policy.retry_delay).await;
                    Ok(())
                })
                .await?;
            }
        }
    }
}

async fn run_attempt<T, Fut>(operation: &str, future: Fut, timeout: Option<Duration>) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| Error::timeout(operation, limit))?,
        None => future.await,
    }
}
