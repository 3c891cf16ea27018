//! Domain models and types for the entity store.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`EntityId`], [`TypeKey`])
//! - **The entity contract** ([`Entity`])
//! - **Partition-scoped queries** ([`DocumentQuery`], [`Filter`], [`OrderBy`])
//! - **Paging types** ([`PagedLoadingParameters`], [`PagedResults`])
//! - **Error types** ([`EntityStoreError`], [`CosmosDbError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, EntityStoreError>`]:
//!
//! ```rust
//! use entity_store::domain::{EntityId, EntityStoreError, Result};
//!
//! fn parse(raw: &str) -> Result<EntityId> {
//!     EntityId::new(raw).map_err(EntityStoreError::Validation)
//! }
//!
//! assert!(parse("").is_err());
//! ```

pub mod context;
pub mod entity;
pub mod errors;
pub mod ids;
pub mod paging;
pub mod query;
pub mod result;

// Re-export commonly used types for convenience
pub use entity::{Entity, ENTITY_TYPE_FIELD, ID_FIELD, PARTITION_KEY_PATH};
pub use errors::{CosmosDbError, EntityStoreError};
pub use ids::{EntityId, TypeKey};
pub use paging::{PagedLoadingParameters, PagedResults};
pub use query::{CompareOp, DocumentQuery, FieldPath, Filter, OrderBy, SortDirection};
pub use result::Result;
