//! Logging and observability
//!
//! Structured logging through `tracing`, with an optional rotated JSON file
//! layer. The store emits events whether or not a subscriber is installed.
//!
//! # Example
//!
//! ```no_run
//! use entity_store::logging::init_logging;
//! use entity_store::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(entity_type = "order", "Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the request units charged for an operation
///
/// # Example
///
/// ```
/// use entity_store::log_request_charge;
///
/// log_request_charge!("upsert", 5.71);
/// ```
#[macro_export]
macro_rules! log_request_charge {
    ($operation:expr, $charge:expr) => {
        tracing::trace!(
            operation = $operation,
            request_charge = $charge,
            "Request charge"
        );
    };
}

/// Log a throttled call that will be retried
///
/// # Example
///
/// ```
/// use entity_store::log_throttle_retry;
/// use std::time::Duration;
///
/// log_throttle_retry!(2, Duration::from_millis(250));
/// ```
#[macro_export]
macro_rules! log_throttle_retry {
    ($attempt:expr, $delay:expr) => {
        tracing::warn!(
            attempt = $attempt,
            retry_after_ms = $delay.as_millis() as u64,
            "Throttled by the store, retrying after delay"
        );
    };
}
