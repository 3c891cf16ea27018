//! Error context extension trait
//!
//! Provides `.context()` / `.with_context()` for `Result<T, EntityStoreError>`,
//! similar to `anyhow::Context` but keeping the crate error type.
//!
//! Context is only attached to errors that carry free-form messages
//! (configuration, I/O, serialization, other). Store, validation and
//! cancellation errors pass through untouched so callers can still match on
//! them.
//!
//! # Examples
//!
//! ```rust
//! use entity_store::domain::Result;
//! use entity_store::domain::context::ResultExt;
//!
//! fn read_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .context(format!("Failed to read file: {}", path))
//! }
//! ```

use crate::domain::errors::EntityStoreError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EntityStoreError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| attach(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| attach(e.into(), f()))
    }
}

fn attach(error: EntityStoreError, context: impl std::fmt::Display) -> EntityStoreError {
    match error {
        EntityStoreError::Configuration(msg) => {
            EntityStoreError::Configuration(format!("{context}: {msg}"))
        }
        EntityStoreError::Io(msg) => EntityStoreError::Io(format!("{context}: {msg}")),
        EntityStoreError::Serialization(msg) => {
            EntityStoreError::Serialization(format!("{context}: {msg}"))
        }
        EntityStoreError::Other(msg) => EntityStoreError::Other(format!("{context}: {msg}")),
        other => other,
    }
}
