// Entity Store - Typed entity store over Azure Cosmos DB
// Copyright (c) 2025 Entity Store Contributors
// Licensed under the MIT License

//! # Entity Store
//!
//! A typed entity store over one partitioned, throttled Azure Cosmos DB
//! collection. Every entity type lives in its own partition, keyed by a
//! registered type key.
//!
//! ## Overview
//!
//! This library provides:
//! - **CRUD** for any [`domain::Entity`] type, scoped to its partition
//! - **Paged queries** with a count query plus a continuation-token window
//! - **Bulk import** with concurrent upserts and bounded backoff
//! - **Provisioning** of database, collection and throughput on first use
//! - **Throttle-aware retry** honoring the server's retry-after hint
//!
//! ## Architecture
//!
//! - [`cli`] - Administrative command-line interface
//! - [`core`] - Entity store, connection provider, cursors and bulk import
//! - [`adapters`] - Document client backends (Cosmos DB, in-memory)
//! - [`domain`] - Entity contract, identifiers, queries, paging and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use entity_store::adapters::memory::InMemoryClientFactory;
//! use entity_store::config::{CosmosDbConfig, EntityStoreConfig};
//! use entity_store::core::{ConnectionProvider, EntityStore, TypeKeyCache};
//! use entity_store::domain::Entity;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Order {
//!     entity_id: String,
//!     entity_type: String,
//!     total_cents: i64,
//! }
//!
//! impl Entity for Order {
//!     const TYPE_TAG: &'static str = "Order";
//!     fn entity_id(&self) -> &str { &self.entity_id }
//!     fn entity_type(&self) -> &str { &self.entity_type }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EntityStoreConfig::default();
//! let factory = InMemoryClientFactory::new(
//!     &config.cosmosdb.database_id,
//!     &config.cosmosdb.collection_id,
//! );
//! let provider = ConnectionProvider::new(Arc::new(factory), config.cosmosdb.clone());
//!
//! let mut keys = TypeKeyCache::new();
//! keys.register::<Order>();
//!
//! let store = EntityStore::new(
//!     Arc::new(provider),
//!     Arc::new(keys),
//!     config.store.clone(),
//!     config.bulk.clone(),
//! );
//!
//! let order = Order {
//!     entity_id: "a1".to_string(),
//!     entity_type: "order".to_string(),
//!     total_cents: 4200,
//! };
//! store.insert(&order, None).await?;
//! assert_eq!(store.load_item::<Order>("a1", None).await?, Some(order));
//!
//! store.delete_item::<Order>("a1", None).await?;
//! assert!(store.load_item::<Order>("a1", None).await?.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible call returns [`domain::Result`]. Throttling is retried
//! internally; a missing document on point read is `Ok(None)`; validation
//! errors are raised before any request.
//!
//! ## Logging
//!
//! The crate emits `tracing` events with structured fields such as
//! `entity_type`, `entity_id`, `request_charge` and `retry_after_ms`.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
