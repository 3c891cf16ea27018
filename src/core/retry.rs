//! Throttle-aware retry
//!
//! A throttled call sleeps the server supplied retry-after (or the configured
//! default when the response carried none) and is attempted again, without a
//! retry limit. Every other failure returns immediately.

use crate::core::cancel::{ensure_not_cancelled, sleep_or_cancel, CancellationSignal};
use crate::domain::result::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs `call` until it succeeds or fails with a non-throttling error
pub async fn retry_throttled<T, F, Fut>(
    default_retry_after: Duration,
    cancel: Option<&CancellationSignal>,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        ensure_not_cancelled(cancel, operation)?;

        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_throttled() => {
                attempt += 1;
                let delay = e.retry_after().unwrap_or(default_retry_after);
                tracing::debug!(operation, error = %e, "Request throttled");
                crate::log_throttle_retry!(attempt, delay);
                sleep_or_cancel(delay, cancel, operation).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Counter of open retry override scopes
///
/// A [`RetryOverrideGuard`] is the pass for single-attempt calls
/// (`ConnectionProvider::execute_once`). Calls made without one keep the
/// retry wrapper.
#[derive(Debug, Clone, Default)]
pub struct RetryOverride {
    active: Arc<AtomicUsize>,
}

impl RetryOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope that lasts until the returned guard is dropped
    pub fn suppress(&self) -> RetryOverrideGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        RetryOverrideGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

/// Closes its scope on drop, on every exit path
#[must_use = "the scope closes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct RetryOverrideGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for RetryOverrideGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CosmosDbError, EntityStoreError};
    use std::sync::atomic::AtomicU32;
    use std::time::Instant;

    fn throttled(retry_after: Option<Duration>) -> EntityStoreError {
        CosmosDbError::Throttled {
            retry_after,
            message: "Request rate is large".to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = Instant::now();

        let result = retry_throttled(Duration::from_millis(1), None, "op", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(throttled(Some(Duration::from_millis(25))))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_default_delay_without_hint() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = Instant::now();

        let result = retry_throttled(Duration::from_millis(30), None, "op", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(throttled(None))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = retry_throttled(Duration::from_millis(1), None, "op", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CosmosDbError::QueryFailed("bad query".to_string()).into())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_override_guards_nest() {
        let retry = RetryOverride::new();
        assert!(!retry.is_suppressed());

        let outer = retry.suppress();
        {
            let _inner = retry.suppress();
            assert!(retry.is_suppressed());
        }
        assert!(retry.is_suppressed());

        drop(outer);
        assert!(!retry.is_suppressed());
    }
}
