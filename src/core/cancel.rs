//! Cooperative cancellation
//!
//! The signal is the receiving half of the same `watch` channel the binary
//! flips on SIGINT/SIGTERM. `true` means cancelled.

use crate::domain::errors::EntityStoreError;
use crate::domain::result::Result;
use std::time::Duration;
use tokio::sync::watch;

/// Cancellation signal accepted by every store operation
pub type CancellationSignal = watch::Receiver<bool>;

/// Creates a signal together with the sender that trips it
pub fn cancellation_channel() -> (watch::Sender<bool>, CancellationSignal) {
    watch::channel(false)
}

pub fn is_cancelled(signal: Option<&CancellationSignal>) -> bool {
    signal.is_some_and(|s| *s.borrow())
}

/// Fails with [`EntityStoreError::Cancelled`] once the signal is set
pub fn ensure_not_cancelled(signal: Option<&CancellationSignal>, operation: &str) -> Result<()> {
    if is_cancelled(signal) {
        tracing::debug!(operation, "Operation cancelled");
        return Err(EntityStoreError::Cancelled(operation.to_string()));
    }
    Ok(())
}

/// Sleeps for `duration`, waking early if the signal is set
pub async fn sleep_or_cancel(
    duration: Duration,
    signal: Option<&CancellationSignal>,
    operation: &str,
) -> Result<()> {
    let Some(signal) = signal else {
        tokio::time::sleep(duration).await;
        return Ok(());
    };

    let mut signal = signal.clone();
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = wait_for_cancel(&mut signal) => {
            Err(EntityStoreError::Cancelled(operation.to_string()))
        }
    }
}

/// Resolves once the signal is set; never resolves if the sender is gone
async fn wait_for_cancel(signal: &mut CancellationSignal) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
