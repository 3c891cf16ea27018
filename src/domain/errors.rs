//! Domain error types
//!
//! This module defines the error hierarchy for the entity store.
//! All errors are domain-specific and don't expose third-party SDK types.

use std::time::Duration;
use thiserror::Error;

/// Main entity store error type
///
/// This is the primary error type used throughout the crate.
/// It wraps store-specific errors and keeps validation and cancellation
/// outcomes distinct from failures reported by the database.
#[derive(Debug, Error)]
pub enum EntityStoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cosmos DB-related errors
    #[error("Cosmos DB error: {0}")]
    CosmosDb(#[from] CosmosDbError),

    /// Validation errors raised before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity type has no registered partition key
    #[error("Entity type '{0}' is not registered in the type key cache")]
    UnregisteredEntityType(String),

    /// The operation observed a cancellation signal
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl EntityStoreError {
    /// Returns true when the error is a throttling signal from the store
    pub fn is_throttled(&self) -> bool {
        matches!(self, EntityStoreError::CosmosDb(CosmosDbError::Throttled { .. }))
    }

    /// Server supplied retry-after hint, if this is a throttling error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EntityStoreError::CosmosDb(CosmosDbError::Throttled { retry_after, .. }) => {
                *retry_after
            }
            _ => None,
        }
    }

    /// Returns true when the store reported that the target does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EntityStoreError::CosmosDb(
                CosmosDbError::DocumentNotFound(_)
                    | CosmosDbError::DatabaseNotFound(_)
                    | CosmosDbError::CollectionNotFound(_)
            )
        )
    }

    /// Returns true when the store rejected a create because the id already exists
    pub fn is_conflict(&self) -> bool {
        matches!(self, EntityStoreError::CosmosDb(CosmosDbError::Conflict(_)))
    }

    /// Returns true for cancellation outcomes
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EntityStoreError::Cancelled(_))
    }
}

/// Cosmos DB-specific errors
///
/// Errors reported by a document database backend. Backends classify their
/// native failures into these variants so that retry and not-found handling
/// never depend on SDK types.
#[derive(Debug, Error)]
pub enum CosmosDbError {
    /// Failed to connect to Cosmos DB
    #[error("Failed to connect to Cosmos DB: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Database not found
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Collection not found
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Failed to create database
    #[error("Failed to create database: {0}")]
    DatabaseCreationFailed(String),

    /// Failed to create collection
    #[error("Failed to create collection: {0}")]
    CollectionCreationFailed(String),

    /// Failed to replace the collection throughput offer
    #[error("Failed to update throughput: {0}")]
    ThroughputUpdateFailed(String),

    /// Failed to delete the collection
    #[error("Failed to delete collection: {0}")]
    CollectionDeletionFailed(String),

    /// Failed to insert document
    #[error("Failed to insert document: {0}")]
    InsertFailed(String),

    /// Failed to update document
    #[error("Failed to update document: {0}")]
    UpdateFailed(String),

    /// Failed to delete document
    #[error("Failed to delete document: {0}")]
    DeleteFailed(String),

    /// Failed to query documents
    #[error("Failed to query documents: {0}")]
    QueryFailed(String),

    /// Throttling error (429)
    #[error("Request rate too large (429), retry after: {}", format_retry_after(.retry_after))]
    Throttled {
        /// Server supplied backoff, when present
        retry_after: Option<Duration>,
        /// Store message
        message: String,
    },

    /// Conflict error (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bulk import reported rejected documents
    #[error("Bulk import failed: {imported}/{total} imported, {} bad document(s)", .bad_documents.len())]
    BulkImportFailed {
        /// Documents that were imported
        imported: usize,
        /// Documents submitted
        total: usize,
        /// Ids (or positions) of rejected documents
        bad_documents: Vec<String>,
    },

    /// Invalid request (malformed query, malformed continuation token, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Failed to deserialize response
    #[error("Failed to deserialize response: {0}")]
    DeserializationFailed(String),
}

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!("{}ms", d.as_millis()),
        None => "unspecified".to_string(),
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for EntityStoreError {
    fn from(err: std::io::Error) -> Self {
        EntityStoreError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for EntityStoreError {
    fn from(err: serde_json::Error) -> Self {
        EntityStoreError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for EntityStoreError {
    fn from(err: toml::de::Error) -> Self {
        EntityStoreError::Configuration(format!("TOML parse error: {err}"))
    }
}
