//! Configuration management for the entity store.
//!
//! TOML configuration with `${VAR_NAME}` substitution, defaults for every
//! optional setting, `ENTITY_STORE_<SECTION>_<KEY>` environment overrides and
//! validation on load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use entity_store::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("entity-store.toml")?;
//!
//! println!("Backend: {}", config.backend);
//! println!("Collection: {}", config.cosmosdb.collection_link());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`CosmosDbConfig`] - Endpoint, key, database, collection and throughput
//! - [`StoreConfig`] - Query page size, upsert strategy, retry defaults
//! - [`BulkConfig`] - Bulk import strategy, concurrency and backoff
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! backend = "cosmosdb"
//!
//! [application]
//! log_level = "info"
//!
//! [cosmosdb]
//! endpoint = "https://your-account.documents.azure.com:443/"
//! key = "${ENTITY_STORE_COSMOSDB_KEY}"
//! database_id = "shop"
//! collection_id = "entities"
//! offer_throughput = 400
//!
//! [store]
//! upsert_strategy = "native"
//!
//! [bulk]
//! strategy = "bulk"
//! max_concurrency = 10
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, BackendKind, BulkConfig, BulkStrategy, CosmosDbConfig, EntityStoreConfig,
    LoggingConfig, StoreConfig, UpsertStrategy,
};
pub use secret::{secret_string, SecretString, SecretValue};
