//! Bounded retry for read requests.

use crate::error::{ClientError, ClientResult};
use std::future::Future;
use std::time::Duration;

/// Attempts and exponential backoff bounds for [`retry_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is exhausted. Returns the last error.
///
/// No backoff follows the final attempt. There is no cancellation; callers
/// that need a deadline wrap the returned future in `tokio::time::timeout`.
pub async fn retry_read<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !should_retry(&err) {
                    if attempt > 1 {
                        tracing::warn!(
                            request = label,
                            attempts = attempt,
                            error = %err,
                            "Read request failed"
                        );
                    }
                    return Err(err);
                }

                let delay = policy.backoff(attempt);
                tracing::debug!(
                    request = label,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying read request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Explicit classification first; the message check is a fragile fallback
/// for errors whose source type was lost. Local failures (filter, config,
/// lookups that found nothing) are never retried on their text.
pub fn should_retry(err: &ClientError) -> bool {
    if err.is_retryable() {
        return true;
    }
    if matches!(
        err,
        ClientError::Filter(_)
            | ClientError::Config(_)
            | ClientError::MissingToken { .. }
            | ClientError::MissingProjectPath
            | ClientError::ProjectNotFound { .. }
            | ClientError::UserNotFound { .. }
            | ClientError::UnsupportedAction { .. }
            | ClientError::MissingCapability { .. }
    ) {
        return false;
    }
    let message = err.to_string().to_lowercase();
    ["timeout", "temporary", "connection reset"]
        .iter()
        .any(|needle| message.contains(needle))
}
