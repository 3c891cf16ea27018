//! Clear command implementation
//!
//! Deletes the collection with every document in it, then provisions an
//! empty one. Other running processes keep their old handles.

use super::exit_code_for;
use crate::config::load_config;
use crate::core::{CancellationSignal, ConnectionProvider};
use clap::Args;

/// Arguments for the clear command
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm deletion of every document in the collection
    #[arg(long)]
    pub yes: bool,
}

impl ClearArgs {
    /// Execute the clear command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: CancellationSignal,
    ) -> anyhow::Result<i32> {
        println!("🧹 Clearing collection");
        println!();

        if !self.yes {
            println!("❌ Refusing to delete the collection without --yes");
            return Ok(2);
        }

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let provider = ConnectionProvider::from_config(&config);
        tracing::warn!(collection = %provider.collection_link(), "Clearing collection");

        if let Err(e) = provider.clear_database(Some(&shutdown_signal)).await {
            println!("❌ Failed to delete collection");
            println!("   Error: {e}");
            return Ok(exit_code_for(&e));
        }
        println!("✅ Collection deleted: {}", provider.collection_link());

        match provider.provision().await {
            Ok(_) => {
                println!("✅ Empty collection provisioned");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Re-provisioning failed");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
