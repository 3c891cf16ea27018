//! Validate config command implementation
//!
//! Loads the configuration file and prints a summary of the effective
//! settings.

use crate::config::{load_config, BackendKind};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after parsing and overrides
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Backend: {}", config.backend);

        if config.backend == BackendKind::CosmosDb {
            println!("  Cosmos DB Endpoint: {}", config.cosmosdb.endpoint);
        }
        println!("  Collection: {}", config.cosmosdb.collection_link());
        println!(
            "  Offer Throughput: {} RU/s (rescale on startup: {})",
            config.cosmosdb.offer_throughput, config.cosmosdb.scale_offer_throughput
        );
        println!("  Query Page Size: {}", config.store.query_page_size);
        println!(
            "  Upsert Strategy: {:?} (serialized: {})",
            config.store.upsert_strategy, config.store.serialize_upserts
        );
        println!(
            "  Bulk Strategy: {:?} (concurrency {}, max retries {})",
            config.bulk.strategy, config.bulk.max_concurrency, config.bulk.max_retries
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_invalid_file_exits_with_config_code() {
        let args = ValidateArgs {};
        assert_eq!(args.execute("does-not-exist.toml").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_valid_file_exits_ok() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"memory\"").unwrap();
        file.flush().unwrap();

        let args = ValidateArgs {};
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(args.execute(&path).await.unwrap(), 0);
    }
}
