//! Shared fixtures for integration tests

#![allow(dead_code)]

use entity_store::adapters::memory::{InMemoryAccount, InMemoryClientFactory};
use entity_store::config::{BulkConfig, CosmosDbConfig, StoreConfig};
use entity_store::core::{ConnectionProvider, EntityStore, TypeKeyCache};
use entity_store::domain::Entity;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DATABASE: &str = "testdb";
pub const COLLECTION: &str = "entities";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub entity_id: String,
    pub entity_type: String,
    pub customer: String,
    pub status: String,
    pub total_cents: i64,
}

impl Entity for Order {
    const TYPE_TAG: &'static str = "Order";

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub entity_id: String,
    pub entity_type: String,
    pub name: String,
    pub company: String,
}

impl Entity for Customer {
    const TYPE_TAG: &'static str = "Customer";

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }
}

/// Never registered with the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub entity_id: String,
    pub entity_type: String,
}

impl Entity for Invoice {
    const TYPE_TAG: &'static str = "Invoice";

    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }
}

pub fn order(id: &str, status: &str, total_cents: i64) -> Order {
    Order {
        entity_id: id.to_string(),
        entity_type: "order".to_string(),
        customer: Name().fake(),
        status: status.to_string(),
        total_cents,
    }
}

/// `count` orders with ids `o-000`, `o-001`, ... alternating open/closed
pub fn orders(count: usize) -> Vec<Order> {
    (0..count)
        .map(|i| {
            let status = if i % 2 == 0 { "open" } else { "closed" };
            order(&format!("o-{i:03}"), status, (100i64..100_000i64).fake::<i64>())
        })
        .collect()
}

pub fn customer(id: &str) -> Customer {
    Customer {
        entity_id: id.to_string(),
        entity_type: "customer".to_string(),
        name: Name().fake(),
        company: CompanyName().fake(),
    }
}

pub fn type_keys() -> TypeKeyCache {
    let mut keys = TypeKeyCache::new();
    keys.register::<Order>().register::<Customer>();
    keys
}

pub fn cosmos_options() -> CosmosDbConfig {
    CosmosDbConfig {
        database_id: DATABASE.to_string(),
        collection_id: COLLECTION.to_string(),
        ..Default::default()
    }
}

pub fn bulk_settings() -> BulkConfig {
    BulkConfig {
        initial_backoff_ms: 1,
        max_backoff_ms: 20,
        ..Default::default()
    }
}

/// A store over a fresh in-memory account
pub struct TestStore {
    pub store: EntityStore,
    pub account: InMemoryAccount,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_settings(StoreConfig::default(), bulk_settings())
    }

    pub fn with_settings(settings: StoreConfig, bulk: BulkConfig) -> Self {
        let factory = InMemoryClientFactory::new(DATABASE, COLLECTION);
        let account = factory.account().clone();
        let provider = ConnectionProvider::new(Arc::new(factory), cosmos_options())
            .with_default_retry_after(Duration::from_millis(10));

        Self {
            store: EntityStore::new(Arc::new(provider), Arc::new(type_keys()), settings, bulk),
            account,
        }
    }

    pub fn provider(&self) -> &Arc<ConnectionProvider> {
        self.store.provider()
    }

    /// Provision up front so injected throttles hit document traffic only
    pub async fn provisioned() -> Self {
        let test_store = Self::new();
        test_store.provider().provision().await.unwrap();
        test_store
    }

    pub async fn seeded(items: &[Order]) -> Self {
        let test_store = Self::provisioned().await;
        for item in items {
            test_store.store.insert(item, None).await.unwrap();
        }
        test_store
    }
}
