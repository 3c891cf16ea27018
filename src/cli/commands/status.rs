//! Status command implementation
//!
//! Reports whether the database and collection exist without provisioning
//! anything, plus optional document counts per type key.

use super::exit_code_for;
use crate::config::load_config;
use crate::core::ConnectionProvider;
use crate::domain::{DocumentQuery, TypeKey};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Count documents stored under these type keys
    #[arg(long = "entity-type", value_name = "TYPE_KEY")]
    pub entity_types: Vec<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking store status");

        println!("📊 Entity Store Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let keys = match self
            .entity_types
            .iter()
            .map(TypeKey::new)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(keys) => keys,
            Err(e) => {
                println!("❌ Invalid entity type: {e}");
                return Ok(2);
            }
        };

        let provider = ConnectionProvider::from_config(&config);
        println!("  Backend: {}", config.backend);
        println!("  Collection: {}", provider.collection_link());

        let database = match provider.database_exists().await {
            Ok(exists) => exists,
            Err(e) => {
                println!("❌ Failed to reach the database account");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let collection = if database {
            match provider.collection_exists().await {
                Ok(exists) => exists,
                Err(e) => {
                    println!("❌ Failed to read the collection");
                    println!("   Error: {e}");
                    return Ok(exit_code_for(&e));
                }
            }
        } else {
            false
        };

        println!("  Database: {}", presence(database));
        println!("  Collection: {}", presence(collection));
        println!("  Provider State: {}", provider.state().await);

        if !collection {
            if !keys.is_empty() {
                println!();
                println!("Collection not provisioned; run 'entity-store provision' first.");
            }
            println!();
            return Ok(0);
        }

        if !keys.is_empty() {
            println!();
            println!("{:<30} {:>12}", "Type Key", "Documents");
            println!("{}", "-".repeat(43));
        }

        for key in keys {
            let counted = provider
                .count_documents(&DocumentQuery::partition(key.clone()))
                .await;

            match counted {
                Ok(count) => println!("{:<30} {:>12}", key.as_str(), count),
                Err(e) => {
                    println!("❌ Failed to count '{key}'");
                    println!("   Error: {e}");
                    return Ok(exit_code_for(&e));
                }
            }
        }

        println!();
        Ok(0)
    }
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "✅ present"
    } else {
        "⏸️  missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn memory_config() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"memory\"").unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_status_on_fresh_account() {
        let file = memory_config();
        let args = StatusArgs {
            entity_types: vec!["order".to_string()],
        };
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(args.execute(&path).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_rejects_blank_type_key() {
        let file = memory_config();
        let args = StatusArgs {
            entity_types: vec!["  ".to_string()],
        };
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(args.execute(&path).await.unwrap(), 2);
    }
}
