//! Configuration schema types
//!
//! This module defines the configuration structure that maps to the TOML file.

use crate::config::{secret_string, SecretString};
use serde::{Deserialize, Serialize};

/// Well-known key of the local Cosmos DB emulator
const EMULATOR_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

/// Document database backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Azure Cosmos DB (or its emulator)
    #[default]
    CosmosDb,
    /// Process-local in-memory store
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::CosmosDb => write!(f, "cosmosdb"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// How `insert_or_update` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// Atomic upsert offered by the store
    #[default]
    Native,
    /// Existence query followed by insert or replace (not atomic)
    CheckThenWrite,
}

/// How `bulk_insert` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BulkStrategy {
    /// Concurrent upserts with importer-owned backoff
    #[default]
    Bulk,
    /// One insert after the other, aborting on the first failure
    Sequential,
}

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStoreConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Backend used by the connection provider
    #[serde(default)]
    pub backend: BackendKind,

    /// Cosmos DB connection options
    #[serde(default)]
    pub cosmosdb: CosmosDbConfig,

    /// Entity store behavior
    #[serde(default)]
    pub store: StoreConfig,

    /// Bulk import behavior
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EntityStoreConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.cosmosdb.validate(self.backend)?;
        self.store.validate()?;
        self.bulk.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Default for EntityStoreConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig::default(),
            backend: BackendKind::default(),
            cosmosdb: CosmosDbConfig::default(),
            store: StoreConfig::default(),
            bulk: BulkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Azure Cosmos DB connection options
///
/// Bound once at startup and read-only afterwards. Defaults target the
/// local emulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosDbConfig {
    /// Cosmos DB endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Cosmos DB access key
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default = "default_key")]
    pub key: SecretString,

    /// Database id
    #[serde(default = "default_database_id")]
    pub database_id: String,

    /// Collection (container) id shared by every entity type
    #[serde(default = "default_collection_id")]
    pub collection_id: String,

    /// Provisioned throughput in request units per second
    #[serde(default = "default_offer_throughput")]
    pub offer_throughput: u32,

    /// Rescale throughput at startup even when the collection already exists
    #[serde(default)]
    pub scale_offer_throughput: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl CosmosDbConfig {
    fn validate(&self, backend: BackendKind) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.database_id.trim().is_empty() {
            return Err("cosmosdb.database_id cannot be empty".to_string());
        }

        if self.collection_id.trim().is_empty() {
            return Err("cosmosdb.collection_id cannot be empty".to_string());
        }

        if self.offer_throughput < 400
            || self.offer_throughput > 1_000_000
            || self.offer_throughput % 100 != 0
        {
            return Err(format!(
                "cosmosdb.offer_throughput must be a multiple of 100 between 400 and 1000000, got {}",
                self.offer_throughput
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err("cosmosdb.request_timeout_seconds must be > 0".to_string());
        }

        if backend == BackendKind::Memory {
            return Ok(());
        }

        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| format!("cosmosdb.endpoint '{}' is not a valid URL: {e}", self.endpoint))?;
        if endpoint.scheme() != "https" {
            return Err("cosmosdb.endpoint must start with https://".to_string());
        }

        if self.key.expose_secret().is_empty() {
            return Err("cosmosdb.key cannot be empty".to_string());
        }

        Ok(())
    }

    /// Link of the collection, `dbs/{db}/colls/{coll}`
    pub fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id, self.collection_id)
    }
}

impl Default for CosmosDbConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            key: default_key(),
            database_id: default_database_id(),
            collection_id: default_collection_id(),
            offer_throughput: default_offer_throughput(),
            scale_offer_throughput: false,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Entity store behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Items fetched per round trip when a scan is materialized
    #[serde(default = "default_query_page_size")]
    pub query_page_size: usize,

    /// Write path of `insert_or_update`
    #[serde(default)]
    pub upsert_strategy: UpsertStrategy,

    /// Serialize check-then-write upserts per entity id inside this process
    #[serde(default)]
    pub serialize_upserts: bool,

    /// Backoff used when a throttled response carries no retry-after hint
    #[serde(default = "default_retry_after_ms")]
    pub default_retry_after_ms: u64,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.query_page_size == 0 || self.query_page_size > 1000 {
            return Err(format!(
                "store.query_page_size must be between 1 and 1000, got {}",
                self.query_page_size
            ));
        }
        if self.default_retry_after_ms == 0 {
            return Err("store.default_retry_after_ms must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            query_page_size: default_query_page_size(),
            upsert_strategy: UpsertStrategy::default(),
            serialize_upserts: false,
            default_retry_after_ms: default_retry_after_ms(),
        }
    }
}

/// Bulk import behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Import strategy
    #[serde(default)]
    pub strategy: BulkStrategy,

    /// Concurrent writes in flight on the bulk path
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Throttle retries per document on the bulk path
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl BulkConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 || self.max_concurrency > 100 {
            return Err(format!(
                "bulk.max_concurrency must be between 1 and 100, got {}",
                self.max_concurrency
            ));
        }
        if self.max_retries > 20 {
            return Err(format!(
                "bulk.max_retries must be <= 20, got {}",
                self.max_retries
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "bulk.initial_backoff_ms ({}) must not exceed bulk.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            strategy: BulkStrategy::default(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_endpoint() -> String {
    "https://localhost:8081".to_string()
}

fn default_key() -> SecretString {
    secret_string(EMULATOR_KEY.to_string())
}

fn default_database_id() -> String {
    "entitystore".to_string()
}

fn default_collection_id() -> String {
    "entities".to_string()
}

fn default_offer_throughput() -> u32 {
    400
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_query_page_size() -> usize {
    100
}

fn default_retry_after_ms() -> u64 {
    1000
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_retries() -> usize {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30000
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
