//! Provision command implementation
//!
//! Creates the database and collection if they are missing and applies the
//! configured throughput.

use super::exit_code_for;
use crate::config::load_config;
use crate::core::ConnectionProvider;
use clap::Args;

/// Arguments for the provision command
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Rescale throughput of an existing collection to the configured value
    #[arg(long)]
    pub force_scale: bool,
}

impl ProvisionArgs {
    /// Execute the provision command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(force_scale = self.force_scale, "Provisioning collection");

        println!("🏗️  Provisioning collection");
        println!();

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        if self.force_scale {
            config.cosmosdb.scale_offer_throughput = true;
        }

        let provider = ConnectionProvider::from_config(&config);
        match provider.provision().await {
            Ok(client) => {
                println!("✅ Collection ready: {}", client.collection_link());
                println!("   Backend: {}", client.backend_name());
                if config.cosmosdb.scale_offer_throughput {
                    println!(
                        "   Throughput: {} RU/s",
                        config.cosmosdb.offer_throughput
                    );
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, state = %provider.state().await, "Provisioning failed");
                println!("❌ Provisioning failed");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_provision_memory_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"memory\"").unwrap();
        file.flush().unwrap();

        let args = ProvisionArgs { force_scale: true };
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(args.execute(&path).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provision_missing_config() {
        let args = ProvisionArgs { force_scale: false };
        assert_eq!(args.execute("missing.toml").await.unwrap(), 2);
    }
}
