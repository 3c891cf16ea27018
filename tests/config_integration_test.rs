//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold `ENV_MUTEX`.

use entity_store::config::{
    load_config, load_config_from_str, BackendKind, BulkStrategy, UpsertStrategy,
};
use entity_store::core::EntityStore;
use entity_store::core::TypeKeyCache;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    std::env::remove_var("ENTITY_STORE_APPLICATION_LOG_LEVEL");
    std::env::remove_var("ENTITY_STORE_BACKEND");
    std::env::remove_var("ENTITY_STORE_COSMOSDB_DATABASE_ID");
    std::env::remove_var("ENTITY_STORE_BULK_MAX_RETRIES");
    std::env::remove_var("ENTITY_STORE_STORE_UPSERT_STRATEGY");
    std::env::remove_var("TEST_COSMOS_KEY");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const COMPLETE_CONFIG: &str = r#"
backend = "cosmosdb"

[application]
log_level = "debug"

[cosmosdb]
endpoint = "https://shop.documents.azure.com:443/"
key = "test-key-12345"
database_id = "shop"
collection_id = "records"
offer_throughput = 1000
scale_offer_throughput = true
request_timeout_seconds = 30

[store]
query_page_size = 250
upsert_strategy = "check_then_write"
serialize_upserts = true
default_retry_after_ms = 500

[bulk]
strategy = "sequential"
max_concurrency = 4
max_retries = 8
initial_backoff_ms = 200
max_backoff_ms = 5000

[logging]
local_enabled = true
local_path = "/tmp/entity-store"
local_rotation = "hourly"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(COMPLETE_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.backend, BackendKind::CosmosDb);
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.cosmosdb.endpoint, "https://shop.documents.azure.com:443/");
    assert_eq!(config.cosmosdb.key.expose_secret(), "test-key-12345");
    assert_eq!(config.cosmosdb.collection_link(), "dbs/shop/colls/records");
    assert_eq!(config.cosmosdb.offer_throughput, 1000);
    assert!(config.cosmosdb.scale_offer_throughput);
    assert_eq!(config.cosmosdb.request_timeout_seconds, 30);
    assert_eq!(config.store.query_page_size, 250);
    assert_eq!(config.store.upsert_strategy, UpsertStrategy::CheckThenWrite);
    assert!(config.store.serialize_upserts);
    assert_eq!(config.store.default_retry_after_ms, 500);
    assert_eq!(config.bulk.strategy, BulkStrategy::Sequential);
    assert_eq!(config.bulk.max_concurrency, 4);
    assert_eq!(config.bulk.max_retries, 8);
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_minimal_memory_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let config = load_config_from_str("backend = \"memory\"\n").unwrap();

    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.cosmosdb.database_id, "entitystore");
    assert_eq!(config.cosmosdb.offer_throughput, 400);
    assert_eq!(config.store.upsert_strategy, UpsertStrategy::Native);
    assert_eq!(config.bulk.strategy, BulkStrategy::Bulk);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_COSMOS_KEY", "substituted-key");

    let config = load_config_from_str(
        r#"
[cosmosdb]
endpoint = "https://shop.documents.azure.com:443/"
key = "${TEST_COSMOS_KEY}"
"#,
    )
    .unwrap();
    assert_eq!(config.cosmosdb.key.expose_secret(), "substituted-key");

    cleanup_env_vars();
}

#[test]
fn test_missing_substitution_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let err = load_config_from_str("[cosmosdb]\nkey = \"${TEST_COSMOS_KEY}\"\n").unwrap_err();
    assert!(err.to_string().contains("TEST_COSMOS_KEY"));
}

#[test]
fn test_env_overrides_win_over_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("ENTITY_STORE_BACKEND", "memory");
    std::env::set_var("ENTITY_STORE_COSMOSDB_DATABASE_ID", "override_db");
    std::env::set_var("ENTITY_STORE_BULK_MAX_RETRIES", "2");
    std::env::set_var("ENTITY_STORE_STORE_UPSERT_STRATEGY", "native");

    let file = write_config(COMPLETE_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.cosmosdb.database_id, "override_db");
    assert_eq!(config.bulk.max_retries, 2);
    assert_eq!(config.store.upsert_strategy, UpsertStrategy::Native);

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("ENTITY_STORE_BULK_MAX_RETRIES", "many");

    let err = load_config_from_str("backend = \"memory\"\n").unwrap_err();
    assert!(err.to_string().contains("ENTITY_STORE_BULK_MAX_RETRIES"));

    cleanup_env_vars();
}

#[test]
fn test_validation_failures() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        "[cosmosdb]\noffer_throughput = 450\n",
        "[cosmosdb]\nendpoint = \"http://insecure.example.com\"\n",
        "[cosmosdb]\nkey = \"\"\n",
        "[store]\nquery_page_size = 0\n",
        "[bulk]\nmax_concurrency = 0\n",
        "[bulk]\ninitial_backoff_ms = 5000\nmax_backoff_ms = 1000\n",
        "[logging]\nlocal_rotation = \"weekly\"\n",
    ];

    for case in cases {
        assert!(load_config_from_str(case).is_err(), "accepted: {case}");
    }
}

#[tokio::test]
async fn test_store_from_memory_config() {
    let config = {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        cleanup_env_vars();
        load_config_from_str("backend = \"memory\"\n").unwrap()
    };

    let store = EntityStore::from_config(&config, TypeKeyCache::new());
    store.provider().provision().await.unwrap();
    assert!(store.provider().collection_exists().await.unwrap());
}
