//! Integration tests for connection provisioning

mod common;

use common::{cosmos_options, order, Order, TestStore, COLLECTION, DATABASE};
use entity_store::adapters::memory::{InMemoryAccount, InMemoryClientFactory};
use entity_store::config::CosmosDbConfig;
use entity_store::core::{ConnectionProvider, ProvisioningState};
use entity_store::domain::{DocumentQuery, TypeKey};
use futures::future::join_all;
use std::sync::Arc;

fn provider_over(account: &InMemoryAccount, options: CosmosDbConfig) -> ConnectionProvider {
    let factory = InMemoryClientFactory::with_account(account.clone(), DATABASE, COLLECTION);
    ConnectionProvider::new(Arc::new(factory), options)
}

#[tokio::test]
async fn test_concurrent_first_calls_provision_once() {
    let account = InMemoryAccount::new();
    let provider = provider_over(&account, cosmos_options());

    let clients = join_all((0..10).map(|_| provider.client())).await;

    assert!(clients.iter().all(Result::is_ok));
    assert_eq!(account.connections(), 1);
    assert_eq!(provider.state().await, ProvisioningState::Provisioned);
    assert_eq!(account.throughput(DATABASE, COLLECTION), Some(400));
}

#[tokio::test]
async fn test_existing_collection_keeps_throughput() {
    let account = InMemoryAccount::new();
    let first = provider_over(
        &account,
        CosmosDbConfig {
            offer_throughput: 800,
            ..cosmos_options()
        },
    );
    first.provision().await.unwrap();
    assert_eq!(account.throughput(DATABASE, COLLECTION), Some(800));

    let second = provider_over(
        &account,
        CosmosDbConfig {
            offer_throughput: 1200,
            ..cosmos_options()
        },
    );
    second.provision().await.unwrap();
    assert_eq!(account.throughput(DATABASE, COLLECTION), Some(800));

    let scaling = provider_over(
        &account,
        CosmosDbConfig {
            offer_throughput: 1200,
            scale_offer_throughput: true,
            ..cosmos_options()
        },
    );
    scaling.provision().await.unwrap();
    assert_eq!(account.throughput(DATABASE, COLLECTION), Some(1200));
}

#[tokio::test]
async fn test_existence_checks_do_not_provision() {
    let account = InMemoryAccount::new();
    let provider = provider_over(&account, cosmos_options());

    assert!(!provider.database_exists().await.unwrap());
    assert!(!provider.collection_exists().await.unwrap());
    assert_eq!(provider.state().await, ProvisioningState::Connected);

    provider.provision().await.unwrap();
    assert!(provider.database_exists().await.unwrap());
    assert!(provider.collection_exists().await.unwrap());
}

#[tokio::test]
async fn test_exists_document_is_partition_scoped() {
    let test_store = TestStore::seeded(&[order("a1", "open", 1)]).await;
    let provider = test_store.provider();

    let orders = TypeKey::new("order").unwrap();
    let customers = TypeKey::new("customer").unwrap();
    assert!(provider.exists_document(&orders, "a1", None).await.unwrap());
    assert!(!provider.exists_document(&orders, "a2", None).await.unwrap());
    assert!(!provider.exists_document(&customers, "a1", None).await.unwrap());
}

#[tokio::test]
async fn test_clear_database_forces_reprovisioning() {
    let test_store = TestStore::seeded(&[order("a1", "open", 1)]).await;
    let provider = test_store.provider();

    provider.clear_database(None).await.unwrap();
    assert_eq!(provider.state().await, ProvisioningState::Uninitialized);
    assert!(!provider.collection_exists().await.unwrap());

    let loaded: Vec<Order> = test_store.store.load_items(None).await.unwrap();
    assert!(loaded.is_empty());
    assert_eq!(provider.state().await, ProvisioningState::Provisioned);
    // One handle before the clear, one after
    assert_eq!(test_store.account.connections(), 2);
}

#[tokio::test]
async fn test_clear_missing_collection_succeeds() {
    let test_store = TestStore::provisioned().await;
    let provider = test_store.provider();

    provider.clear_database(None).await.unwrap();
    provider.clear_database(None).await.unwrap();
    assert_eq!(provider.state().await, ProvisioningState::Uninitialized);
}

#[tokio::test]
async fn test_links() {
    let test_store = TestStore::new();
    let provider = test_store.provider();

    assert_eq!(provider.collection_link(), "dbs/testdb/colls/entities");
    assert_eq!(
        provider.document_link("a1"),
        "dbs/testdb/colls/entities/docs/a1"
    );
}

#[tokio::test]
async fn test_count_documents_does_not_provision() {
    let account = InMemoryAccount::new();
    let first = provider_over(
        &account,
        CosmosDbConfig {
            offer_throughput: 800,
            ..cosmos_options()
        },
    );
    first.provision().await.unwrap();

    let inspecting = provider_over(
        &account,
        CosmosDbConfig {
            offer_throughput: 1200,
            scale_offer_throughput: true,
            ..cosmos_options()
        },
    );
    let orders = TypeKey::new("order").unwrap();
    let count = inspecting
        .count_documents(&DocumentQuery::partition(orders))
        .await
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(inspecting.state().await, ProvisioningState::Connected);
    assert_eq!(account.throughput(DATABASE, COLLECTION), Some(800));
}
