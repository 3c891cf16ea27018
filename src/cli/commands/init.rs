//! Init command implementation
//!
//! Writes a sample configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "entity-store.toml")]
    pub output: String,

    /// Include comments explaining every setting
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing entity store configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let contents = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, contents) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your account settings", self.output);
                println!("  2. Set ENTITY_STORE_COSMOSDB_KEY in the environment or a .env file");
                println!("  3. Validate configuration: entity-store validate-config");
                println!("  4. Create database and collection: entity-store provision");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> String {
        r#"# Entity Store Configuration

backend = "cosmosdb"  # cosmosdb | memory

[application]
log_level = "info"

[cosmosdb]
endpoint = "https://your-account.documents.azure.com:443/"
key = "${ENTITY_STORE_COSMOSDB_KEY}"
database_id = "entitystore"
collection_id = "entities"
offer_throughput = 400
scale_offer_throughput = false
request_timeout_seconds = 60

[store]
query_page_size = 100
upsert_strategy = "native"
serialize_upserts = false
default_retry_after_ms = 1000

[bulk]
strategy = "bulk"
max_concurrency = 10
max_retries = 5
initial_backoff_ms = 1000
max_backoff_ms = 30000

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    fn generate_config_with_examples() -> String {
        r#"# Entity Store Configuration
#
# Values may reference environment variables with ${VAR}. Every setting can
# also be overridden with ENTITY_STORE_<SECTION>_<KEY>, for example
# ENTITY_STORE_COSMOSDB_DATABASE_ID or ENTITY_STORE_BULK_MAX_RETRIES.

# Backend: "cosmosdb" talks to an Azure Cosmos DB account, "memory" keeps
# documents in process (tests and local experiments)
backend = "cosmosdb"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Cosmos DB
# ============================================================================
[cosmosdb]
# Account endpoint (https only)
endpoint = "https://your-account.documents.azure.com:443/"

# Account key (use an environment variable)
key = "${ENTITY_STORE_COSMOSDB_KEY}"

# Database and collection, created on first use
database_id = "entitystore"
collection_id = "entities"

# Provisioned throughput in RU/s (400-1000000, multiple of 100)
offer_throughput = 400

# Rescale throughput of an existing collection on startup
scale_offer_throughput = false

# Timeout of a single request in seconds
request_timeout_seconds = 60

# ============================================================================
# Store Behavior
# ============================================================================
[store]
# Items fetched per round trip when loading every item of a type (1-1000)
query_page_size = 100

# insert_or_update strategy:
# - native: atomic upsert
# - check_then_write: existence query, then insert or replace (not atomic)
upsert_strategy = "native"

# Serialize check_then_write upserts per id inside this process
serialize_upserts = false

# Backoff for throttled responses without a retry-after hint
default_retry_after_ms = 1000

# ============================================================================
# Bulk Import
# ============================================================================
[bulk]
# Strategy:
# - bulk: concurrent upserts, rejected documents reported per item
# - sequential: one insert at a time, stops at the first failure
strategy = "bulk"

# Concurrent writes (1-100)
max_concurrency = 10

# Throttle retries per document (0-20)
max_retries = 5

# Exponential backoff bounds in milliseconds
initial_backoff_ms = 1000
max_backoff_ms = 30000

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "logs"

# Rotation: daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_generated_configs_are_complete() {
        for config in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            for section in ["[application]", "[cosmosdb]", "[store]", "[bulk]", "[logging]"] {
                assert!(config.contains(section), "missing {section}");
            }
        }
    }

    #[test]
    fn test_minimal_config_loads_with_key_set() {
        let contents = InitArgs::generate_minimal_config()
            .replace("${ENTITY_STORE_COSMOSDB_KEY}", "c2VjcmV0");
        let config = load_config_from_str(&contents).unwrap();
        assert_eq!(config.cosmosdb.database_id, "entitystore");
        assert_eq!(config.bulk.max_retries, 5);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity-store.toml");
        std::fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
    }
}
