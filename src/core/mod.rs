//! Core logic of the entity store.
//!
//! # Modules
//!
//! - [`type_keys`] - Entity type to partition key registry
//! - [`provider`] - Lazy connection, provisioning and the throttle-retry wrapper
//! - [`cursor`] - Continuation cursor over partition-scoped queries
//! - [`store`] - Typed CRUD, paging and bulk surface
//! - [`bulk`] - Bulk import strategies
//! - [`retry`] - Throttle retry loop and the scoped retry override
//! - [`cancel`] - Cooperative cancellation
//!
//! # Request Flow
//!
//! 1. **Resolve**: look up the partition key of the entity type
//! 2. **Provision**: create database and collection on first use
//! 3. **Execute**: run the call through the retry wrapper
//! 4. **Map**: deserialize documents back into typed entities
//!
//! # Example
//!
//! ```rust,no_run
//! use entity_store::config::load_config;
//! use entity_store::core::{EntityStore, TypeKeyCache};
//! # use entity_store::domain::Entity;
//! # #[derive(serde::Serialize, serde::Deserialize)]
//! # struct Order { entity_id: String, entity_type: String }
//! # impl Entity for Order {
//! #     const TYPE_TAG: &'static str = "Order";
//! #     fn entity_id(&self) -> &str { &self.entity_id }
//! #     fn entity_type(&self) -> &str { &self.entity_type }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("entity-store.toml")?;
//!
//! let mut keys = TypeKeyCache::new();
//! keys.register::<Order>();
//!
//! let store = EntityStore::from_config(&config, keys);
//! let orders = store.load_items::<Order>(None).await?;
//! println!("Orders: {}", orders.len());
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod cancel;
pub mod cursor;
pub mod provider;
pub mod retry;
pub mod store;
pub mod type_keys;

pub use bulk::{BadDocument, BulkImportResult, BulkImporter};
pub use cancel::{cancellation_channel, CancellationSignal};
pub use cursor::QueryCursor;
pub use provider::{ConnectionProvider, ProvisioningState};
pub use retry::{RetryOverride, RetryOverrideGuard};
pub use store::EntityStore;
pub use type_keys::TypeKeyCache;
