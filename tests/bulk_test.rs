//! Integration tests for bulk import

mod common;

use common::{bulk_settings, order, orders, Order, TestStore};
use entity_store::config::{BulkConfig, BulkStrategy, StoreConfig};
use entity_store::core::cancellation_channel;
use entity_store::domain::{CosmosDbError, EntityStoreError};
use std::time::Duration;

async fn store_with(bulk: BulkConfig) -> TestStore {
    let test_store = TestStore::with_settings(StoreConfig::default(), bulk);
    test_store.provider().provision().await.unwrap();
    test_store
}

fn sequential() -> BulkConfig {
    BulkConfig {
        strategy: BulkStrategy::Sequential,
        ..bulk_settings()
    }
}

/// `count` orders where item `bad` has a blank id
fn batch_with_bad_item(count: usize, bad: usize) -> Vec<Order> {
    let mut items = orders(count);
    items[bad].entity_id = String::new();
    items
}

async fn stored_ids(test_store: &TestStore) -> Vec<String> {
    let loaded: Vec<Order> = test_store.store.load_items(None).await.unwrap();
    loaded.into_iter().map(|o| o.entity_id).collect()
}

#[tokio::test]
async fn test_bulk_imports_every_item() {
    let test_store = store_with(bulk_settings()).await;
    let items = orders(25);

    let result = test_store.store.bulk_insert(&items, None).await.unwrap();

    assert_eq!(result.documents_imported, 25);
    assert!(result.is_complete());
    assert!(result.request_units_consumed > 0.0);
    assert_eq!(stored_ids(&test_store).await.len(), 25);
}

#[tokio::test]
async fn test_bulk_uses_upsert_semantics() {
    let test_store = store_with(bulk_settings()).await;
    test_store.store.insert(&order("o-001", "open", 1), None).await.unwrap();

    let items = orders(3);
    test_store.store.bulk_insert(&items, None).await.unwrap();

    let loaded = test_store
        .store
        .load_item::<Order>("o-001", None)
        .await
        .unwrap();
    assert_eq!(loaded, Some(items[1].clone()));
}

#[tokio::test]
async fn test_bulk_bad_item_fails_batch() {
    let test_store = store_with(bulk_settings()).await;
    let items = batch_with_bad_item(6, 3);

    let err = test_store.store.bulk_insert(&items, None).await.unwrap_err();
    match err {
        EntityStoreError::CosmosDb(CosmosDbError::BulkImportFailed {
            imported,
            total,
            bad_documents,
        }) => {
            assert_eq!(imported, 5);
            assert_eq!(total, 6);
            assert_eq!(bad_documents, vec!["#3".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Valid items of the batch stay written
    assert_eq!(stored_ids(&test_store).await.len(), 5);
}

#[tokio::test]
async fn test_bulk_import_reports_structured_result() {
    let test_store = store_with(bulk_settings()).await;
    let mut items = orders(4);
    items[2].entity_type = "customer".to_string();

    let result = test_store.store.bulk_import(&items, None).await.unwrap();

    assert_eq!(result.documents_imported, 3);
    assert_eq!(result.bad_documents.len(), 1);
    assert_eq!(result.bad_documents[0].index, 2);
    assert_eq!(result.bad_documents[0].label(), "o-002");
}

#[tokio::test]
async fn test_bulk_backs_off_on_throttling() {
    let test_store = store_with(bulk_settings()).await;
    test_store
        .account
        .throttle_next(3, Some(Duration::from_millis(2)));

    let result = test_store.store.bulk_insert(&orders(8), None).await.unwrap();

    assert_eq!(result.documents_imported, 8);
    assert_eq!(test_store.account.throttled_count(), 3);
    assert!(!test_store.provider().retries_suppressed());
}

#[tokio::test]
async fn test_bulk_gives_up_after_max_retries() {
    let bulk = BulkConfig {
        max_retries: 0,
        max_concurrency: 1,
        ..bulk_settings()
    };
    let test_store = store_with(bulk).await;
    test_store.account.throttle_next(1, None);

    let result = test_store.store.bulk_import(&orders(4), None).await.unwrap();

    assert_eq!(result.documents_imported, 3);
    assert_eq!(result.bad_documents.len(), 1);
    assert!(!test_store.provider().retries_suppressed());
}

#[tokio::test]
async fn test_bulk_restores_retries_after_cancel() {
    let test_store = store_with(bulk_settings()).await;
    let (tx, rx) = cancellation_channel();
    tx.send(true).unwrap();

    let err = test_store
        .store
        .bulk_insert(&orders(5), Some(&rx))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!test_store.provider().retries_suppressed());
}

#[tokio::test]
async fn test_sequential_stops_at_first_failure() {
    let test_store = store_with(sequential()).await;
    let items = batch_with_bad_item(6, 3);

    let err = test_store.store.bulk_insert(&items, None).await.unwrap_err();
    assert!(matches!(
        err,
        EntityStoreError::CosmosDb(CosmosDbError::BulkImportFailed { imported: 3, .. })
    ));

    let mut ids = stored_ids(&test_store).await;
    ids.sort();
    assert_eq!(ids, vec!["o-000", "o-001", "o-002"]);
}

#[tokio::test]
async fn test_sequential_conflict_stops_import() {
    let test_store = store_with(sequential()).await;
    test_store.store.insert(&order("o-001", "open", 1), None).await.unwrap();

    let result = test_store.store.bulk_import(&orders(4), None).await.unwrap();

    assert_eq!(result.documents_imported, 1);
    assert_eq!(result.bad_documents.len(), 1);
    assert_eq!(result.bad_documents[0].label(), "o-001");
    assert_eq!(stored_ids(&test_store).await.len(), 2);
}

#[tokio::test]
async fn test_sequential_retries_throttles() {
    let test_store = store_with(sequential()).await;
    test_store
        .account
        .throttle_next(2, Some(Duration::from_millis(2)));

    let result = test_store.store.bulk_insert(&orders(3), None).await.unwrap();
    assert_eq!(result.documents_imported, 3);
}

#[tokio::test]
async fn test_bulk_backoff_leaves_other_callers_retrying() {
    let bulk = BulkConfig {
        max_concurrency: 1,
        initial_backoff_ms: 300,
        max_backoff_ms: 1_000,
        ..bulk_settings()
    };
    let test_store = store_with(bulk).await;
    test_store.store.insert(&order("x-1", "open", 1), None).await.unwrap();
    let items = orders(2);

    // The import's first upsert is throttled and backs off for ~300ms
    test_store.account.throttle_next(1, None);
    let import = test_store.store.bulk_insert(&items, None);
    let concurrent = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let suppressed = test_store.provider().retries_suppressed();
        test_store
            .account
            .throttle_next(1, Some(Duration::from_millis(5)));
        let loaded = test_store.store.load_item::<Order>("x-1", None).await;
        (suppressed, loaded)
    };

    let (imported, (suppressed, loaded)) = tokio::join!(import, concurrent);

    assert!(suppressed);
    assert!(loaded.unwrap().is_some());
    assert_eq!(imported.unwrap().documents_imported, 2);
    assert_eq!(test_store.account.throttled_count(), 2);
    assert!(!test_store.provider().retries_suppressed());
}
