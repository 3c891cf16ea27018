//! Document client factory
//!
//! Picks the backend named by the configuration.

use crate::adapters::cosmosdb::CosmosClientFactory;
use crate::adapters::document::traits::DocumentClientFactory;
use crate::adapters::memory::InMemoryClientFactory;
use crate::config::schema::{BackendKind, EntityStoreConfig};
use std::sync::Arc;

/// Create a client factory based on the configuration
///
/// No connection is opened here; the connection provider calls
/// [`DocumentClientFactory::connect`] when it first needs a handle.
pub fn create_client_factory(config: &EntityStoreConfig) -> Arc<dyn DocumentClientFactory> {
    match config.backend {
        BackendKind::CosmosDb => {
            tracing::info!(endpoint = %config.cosmosdb.endpoint, "Using Cosmos DB backend");
            Arc::new(CosmosClientFactory::new(config.cosmosdb.clone()))
        }
        BackendKind::Memory => {
            tracing::info!("Using in-memory backend");
            Arc::new(InMemoryClientFactory::new(
                &config.cosmosdb.database_id,
                &config.cosmosdb.collection_id,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_factory_from_config() {
        let config = EntityStoreConfig {
            backend: BackendKind::Memory,
            ..Default::default()
        };

        let factory = create_client_factory(&config);
        let client = factory.connect().await.unwrap();
        assert_eq!(client.backend_name(), "memory");
        assert_eq!(client.collection_link(), "dbs/entitystore/colls/entities");
        assert_eq!(
            client.document_link("a1"),
            "dbs/entitystore/colls/entities/docs/a1"
        );
    }
}
