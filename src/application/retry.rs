use crate::error::{Result, StoreError};
use std::future::Future;
use std::time::Duration;

/// Exponential backoff for operations that lost an optimistic version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap for the doubled delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Doubles `delay` up to `max_delay`, saturating instead of overflowing.
    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

/// Runs `op` until it returns something other than `ConcurrentModification`
/// or the attempts run out. Every attempt starts from a fresh read, so no
/// state is carried between attempts. Other errors are returned immediately.
pub async fn retry_on_conflict<F, Fut, T>(policy: RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    let mut delay = policy.initial_delay;

    loop {
        match op(attempt).await {
            Err(StoreError::ConcurrentModification(record)) if attempt < policy.max_attempts => {
                tracing::debug!(operation, attempt, %record, "lost version check, retrying");
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}
