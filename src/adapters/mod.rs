//! External system integrations for the entity store.
//!
//! - [`document`] - Document database abstraction (trait-based)
//! - [`cosmosdb`] - Azure Cosmos DB implementation
//! - [`memory`] - In-memory implementation for tests and local development
//!
//! # Design Pattern
//!
//! Adapters isolate the database SDK behind the
//! [`DocumentClient`](document::DocumentClient) trait so the store and the
//! connection provider can be exercised against the in-memory backend.
//!
//! ```rust
//! use entity_store::adapters::document::DocumentClientFactory;
//! use entity_store::adapters::memory::InMemoryClientFactory;
//!
//! # async fn example() -> entity_store::domain::Result<()> {
//! let factory = InMemoryClientFactory::new("shop", "entities");
//! let client = factory.connect().await?;
//! assert!(!client.database_exists().await?);
//! # Ok(())
//! # }
//! ```

pub mod cosmosdb;
pub mod document;
pub mod memory;
