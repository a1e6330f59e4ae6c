//! Backoff for GitHub's secondary rate limit.
//!
//! GitHub answers abusive request bursts with a 403 whose message mentions a
//! "secondary rate limit", optionally with a `Retry-After` header. The policy
//! here sleeps for that long (30s when absent) plus up to a second of jitter
//! and repeats the call. There is no retry ceiling: the loop only continues
//! while the rate limit keeps recurring. Every other failure is returned
//! immediately. Callers needing a deadline wrap the call in
//! `tokio::time::timeout`.

use std::future::Future;
use std::time::Duration;

use http::StatusCode;
use tracing::debug;

use crate::forge::GitApiError;

/// Seconds to wait when a rate-limited response carries no `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

const SECONDARY_RATE_LIMIT_PATTERN: &str = "secondary rate limit";

/// Something that can wait. Abstracted for testing.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry forever on secondary rate limiting, fail fast on anything else.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy<S = TokioSleeper> {
    sleeper: S,
}

impl<S: Sleeper> RetryPolicy<S> {
    pub fn new(sleeper: S) -> Self {
        Self { sleeper }
    }

    /// Run `call` until it succeeds or fails with something other than a
    /// secondary rate limit. `call` must issue the same logical request
    /// every time it is invoked.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, GitApiError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, GitApiError>> + Send,
        T: Send,
    {
        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_secondary_rate_limit(&err) {
                debug!(
                    operation,
                    status = ?status_of(&err),
                    secondary_rate_limit = false,
                    error = %err,
                    "request failed"
                );
                return Err(err);
            }

            let delay = backoff_delay(retry_after(&err), rand::random::<f64>());
            debug!(
                operation,
                status = ?status_of(&err),
                secondary_rate_limit = true,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "rate limited, retrying"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

/// A 403 whose message mentions a secondary rate limit.
pub fn is_secondary_rate_limit(err: &GitApiError) -> bool {
    match err {
        GitApiError::Api {
            status, message, ..
        } => {
            *status == StatusCode::FORBIDDEN
                && message
                    .to_lowercase()
                    .contains(SECONDARY_RATE_LIMIT_PATTERN)
        }
        _ => false,
    }
}

/// `Retry-After` (or the default) plus `jitter` seconds, `jitter` in `[0, 1)`.
pub fn backoff_delay(retry_after: Option<u64>, jitter: f64) -> Duration {
    let base = Duration::from_secs(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS));
    base + Duration::from_secs_f64(jitter.clamp(0.0, 0.999))
}

fn retry_after(err: &GitApiError) -> Option<u64> {
    match err {
        GitApiError::Api { retry_after, .. } => *retry_after,
        _ => None,
    }
}

fn status_of(err: &GitApiError) -> Option<StatusCode> {
    match err {
        GitApiError::Api { status, .. } => Some(*status),
        _ => None,
    }
}
