//! Cosmos DB client implementation
//!
//! This module provides the [`DocumentClient`] backend for Azure Cosmos DB.

use crate::adapters::document::continuation::{decode_continuation, encode_continuation};
use crate::adapters::document::traits::{
    DocumentClient, DocumentClientFactory, PageRequest, QueryPage, WriteResponse,
};
use crate::config::CosmosDbConfig;
use crate::domain::ids::TypeKey;
use crate::domain::query::DocumentQuery;
use crate::domain::{CosmosDbError, EntityStoreError, Result};
use async_trait::async_trait;
use azure_core::credentials::Secret;
use azure_core::error::ErrorKind;
use azure_core::http::headers::{HeaderName, Headers, X_MS_RETRY_AFTER_MS};
use azure_core::http::StatusCode;
use azure_data_cosmos::clients::{ContainerClient, DatabaseClient};
use azure_data_cosmos::models::{
    ContainerProperties, IndexingPolicy, PartitionKeyDefinition, PartitionKeyKind,
    ThroughputProperties,
};
use azure_data_cosmos::{CosmosClient, CosmosClientOptions, PartitionKey};
use futures::stream::StreamExt;
use serde_json::Value;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_CHARGE: HeaderName = HeaderName::from_static("x-ms-request-charge");

/// How an SDK error maps onto the store's error model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    Throttled,
    NotFound,
    Conflict,
    Unauthorized,
    Other,
}

/// Classifies an SDK error by its HTTP status
///
/// Errors raised before a response arrived carry no status and fall back to
/// the rendered message.
fn classify(error: &azure_core::Error) -> ErrorClass {
    match error.http_status() {
        Some(StatusCode::TooManyRequests) => ErrorClass::Throttled,
        Some(StatusCode::NotFound) => ErrorClass::NotFound,
        Some(StatusCode::Conflict) => ErrorClass::Conflict,
        Some(StatusCode::Unauthorized | StatusCode::Forbidden) => ErrorClass::Unauthorized,
        Some(_) => ErrorClass::Other,
        None => classify_message(&error.to_string()),
    }
}

fn classify_message(message: &str) -> ErrorClass {
    if message.contains("TooManyRequests") || message.contains("Request rate is large") {
        ErrorClass::Throttled
    } else if message.contains("Unauthorized") || message.contains("Forbidden") {
        ErrorClass::Unauthorized
    } else {
        ErrorClass::Other
    }
}

/// Server supplied wait from the `x-ms-retry-after-ms` response header
fn retry_after(error: &azure_core::Error) -> Option<Duration> {
    match error.kind() {
        ErrorKind::HttpResponse {
            raw_response: Some(response),
            ..
        } => response
            .headers()
            .get_optional_str(&X_MS_RETRY_AFTER_MS)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| Duration::from_secs_f64(ms / 1000.0)),
        _ => None,
    }
}

/// Maps an SDK error, keeping throttling and auth failures recognizable
fn map_sdk_error(
    error: azure_core::Error,
    context: fn(String) -> CosmosDbError,
) -> EntityStoreError {
    let message = error.to_string();
    let mapped = match classify(&error) {
        ErrorClass::Throttled => CosmosDbError::Throttled {
            retry_after: retry_after(&error),
            message,
        },
        ErrorClass::Unauthorized => CosmosDbError::AuthenticationFailed(message),
        _ => context(message),
    };
    mapped.into()
}

fn request_charge(headers: &Headers) -> f64 {
    headers
        .get_optional_str(&REQUEST_CHARGE)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

/// Cosmos DB document client
///
/// Bound to one database and one collection.
pub struct CosmosDocumentClient {
    /// Cosmos DB client
    client: CosmosClient,

    /// Database client
    database: DatabaseClient,

    /// Collection (container) client
    container: ContainerClient,

    /// Configuration
    config: CosmosDbConfig,
}

impl CosmosDocumentClient {
    /// Create a new Cosmos DB client
    ///
    /// No request is sent; the first call reaches the service.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the SDK rejects the endpoint or key.
    pub fn new(config: CosmosDbConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        let key = Secret::new(config.key.expose_secret().as_ref().to_string());
        let options = Some(CosmosClientOptions::default());

        let client = CosmosClient::with_key(&config.endpoint, key, options).map_err(|e| {
            EntityStoreError::CosmosDb(CosmosDbError::ConnectionFailed(format!(
                "Failed to create Cosmos client: {e}"
            )))
        })?;

        let database = client.database_client(&config.database_id);
        let container = database.container_client(&config.collection_id);

        Ok(Self {
            client,
            database,
            container,
            config,
        })
    }

    fn partition(partition_key: &TypeKey) -> PartitionKey {
        PartitionKey::from(partition_key.as_str().to_string())
    }

    /// Bounds a call by the configured request timeout
    async fn timed<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = Duration::from_secs(self.config.request_timeout_seconds);
        tokio::time::timeout(limit, call).await.map_err(|_| {
            EntityStoreError::CosmosDb(CosmosDbError::Timeout(format!(
                "{operation} did not complete within {}s",
                limit.as_secs()
            )))
        })?
    }

    /// Existence check from a read outcome; 404 means absent
    fn exists<T>(outcome: std::result::Result<T, azure_core::Error>) -> Result<bool> {
        match outcome {
            Ok(_) => Ok(true),
            Err(e) if classify(&e) == ErrorClass::NotFound => Ok(false),
            Err(e) => Err(map_sdk_error(e, CosmosDbError::ConnectionFailed)),
        }
    }

    /// Drains a query page by page, summing the request charge of each page
    async fn collect_query(&self, sql: String, partition_key: &TypeKey) -> Result<(Vec<Value>, f64)> {
        tracing::trace!(sql = %sql, partition_key = %partition_key, "Cosmos DB query");

        let mut pages = self
            .container
            .query_items::<Value>(sql, Self::partition(partition_key), None)
            .map_err(|e| map_sdk_error(e, CosmosDbError::QueryFailed))?
            .into_pages();

        let mut documents = Vec::new();
        let mut charge = 0.0;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error(e, CosmosDbError::QueryFailed))?;
            charge += request_charge(page.headers());
            documents.extend(page.into_items());
        }
        Ok((documents, charge))
    }
}

#[async_trait]
impl DocumentClient for CosmosDocumentClient {
    fn backend_name(&self) -> &'static str {
        "cosmosdb"
    }

    fn database_id(&self) -> &str {
        &self.config.database_id
    }

    fn collection_id(&self) -> &str {
        &self.config.collection_id
    }

    async fn database_exists(&self) -> Result<bool> {
        let outcome = self
            .timed("read database", async { Ok(self.database.read(None).await) })
            .await?;
        Self::exists(outcome)
    }

    async fn create_database(&self) -> Result<()> {
        tracing::info!(database = %self.config.database_id, "Creating database");

        self.timed("create database", async {
            self.client
                .create_database(&self.config.database_id, None)
                .await
                .map_err(|e| map_sdk_error(e, CosmosDbError::DatabaseCreationFailed))
        })
        .await?;

        tracing::info!(database = %self.config.database_id, "Database created successfully");
        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool> {
        let outcome = self
            .timed("read collection", async { Ok(self.container.read(None).await) })
            .await?;
        Self::exists(outcome)
    }

    async fn create_collection(&self, partition_key_path: &str) -> Result<()> {
        let collection_id = &self.config.collection_id;
        tracing::info!(collection = %collection_id, partition_key = %partition_key_path, "Creating collection");

        let properties = ContainerProperties {
            id: Cow::Owned(collection_id.clone()),
            partition_key: PartitionKeyDefinition {
                paths: vec![partition_key_path.to_string()],
                kind: PartitionKeyKind::Hash,
                version: None,
            },
            indexing_policy: Some(IndexingPolicy::default()),
            ..Default::default()
        };

        self.timed("create collection", async {
            self.database
                .create_container(properties, None)
                .await
                .map_err(|e| map_sdk_error(e, CosmosDbError::CollectionCreationFailed))
        })
        .await?;

        tracing::info!(collection = %collection_id, "Collection created successfully");
        Ok(())
    }

    async fn replace_throughput(&self, throughput: u32) -> Result<()> {
        let offer = usize::try_from(throughput).map_err(|e| {
            EntityStoreError::CosmosDb(CosmosDbError::ThroughputUpdateFailed(format!(
                "Throughput {throughput} out of range: {e}"
            )))
        })?;

        self.timed("replace throughput", async {
            self.container
                .replace_throughput(ThroughputProperties::manual(offer), None)
                .await
                .map_err(|e| map_sdk_error(e, CosmosDbError::ThroughputUpdateFailed))
        })
        .await?;

        tracing::info!(collection = %self.config.collection_id, throughput, "Throughput replaced");
        Ok(())
    }

    async fn delete_collection(&self) -> Result<()> {
        self.timed("delete collection", async {
            self.container.delete(None).await.map_err(|e| {
                if classify(&e) == ErrorClass::NotFound {
                    CosmosDbError::CollectionNotFound(self.collection_link()).into()
                } else {
                    map_sdk_error(e, CosmosDbError::CollectionDeletionFailed)
                }
            })
        })
        .await?;
        Ok(())
    }

    async fn read_document(&self, partition_key: &TypeKey, id: &str) -> Result<Option<Value>> {
        let response = self
            .timed("read document", async {
                Ok(self
                    .container
                    .read_item::<Value>(Self::partition(partition_key), id, None)
                    .await)
            })
            .await?;

        match response {
            Ok(response) => {
                crate::log_request_charge!("read", request_charge(response.headers()));
                let document = response.into_body().map_err(|e| {
                    EntityStoreError::CosmosDb(CosmosDbError::DeserializationFailed(format!(
                        "Failed to deserialize document {id}: {e}"
                    )))
                })?;
                Ok(Some(document))
            }
            Err(e) if classify(&e) == ErrorClass::NotFound => Ok(None),
            Err(e) => Err(map_sdk_error(e, CosmosDbError::QueryFailed)),
        }
    }

    async fn create_document(
        &self,
        partition_key: &TypeKey,
        document: Value,
    ) -> Result<WriteResponse> {
        let response = self
            .timed("create document", async {
                self.container
                    .create_item(Self::partition(partition_key), document, None)
                    .await
                    .map_err(|e| match classify(&e) {
                        ErrorClass::Conflict => CosmosDbError::Conflict(e.to_string()).into(),
                        _ => map_sdk_error(e, CosmosDbError::InsertFailed),
                    })
            })
            .await?;

        Ok(WriteResponse {
            request_charge: request_charge(response.headers()),
        })
    }

    async fn replace_document(
        &self,
        partition_key: &TypeKey,
        id: &str,
        document: Value,
    ) -> Result<WriteResponse> {
        let response = self
            .timed("replace document", async {
                self.container
                    .replace_item(Self::partition(partition_key), id, document, None)
                    .await
                    .map_err(|e| match classify(&e) {
                        ErrorClass::NotFound => CosmosDbError::DocumentNotFound(id.to_string()).into(),
                        _ => map_sdk_error(e, CosmosDbError::UpdateFailed),
                    })
            })
            .await?;

        Ok(WriteResponse {
            request_charge: request_charge(response.headers()),
        })
    }

    async fn upsert_document(
        &self,
        partition_key: &TypeKey,
        document: Value,
    ) -> Result<WriteResponse> {
        let response = self
            .timed("upsert document", async {
                self.container
                    .upsert_item(Self::partition(partition_key), document, None)
                    .await
                    .map_err(|e| map_sdk_error(e, CosmosDbError::UpdateFailed))
            })
            .await?;

        Ok(WriteResponse {
            request_charge: request_charge(response.headers()),
        })
    }

    async fn delete_document(&self, partition_key: &TypeKey, id: &str) -> Result<WriteResponse> {
        let response = self
            .timed("delete document", async {
                self.container
                    .delete_item(Self::partition(partition_key), id, None)
                    .await
                    .map_err(|e| match classify(&e) {
                        ErrorClass::NotFound => CosmosDbError::DocumentNotFound(id.to_string()).into(),
                        _ => map_sdk_error(e, CosmosDbError::DeleteFailed),
                    })
            })
            .await?;

        Ok(WriteResponse {
            request_charge: request_charge(response.headers()),
        })
    }

    async fn query_documents(
        &self,
        query: &DocumentQuery,
        page: &PageRequest,
    ) -> Result<QueryPage> {
        let offset = decode_continuation(page.continuation_token.as_deref())?;
        let max_items = page.max_items.max(1);

        // One look-ahead item tells whether another page exists
        let sql = format!("{} OFFSET {} LIMIT {}", query.to_sql(), offset, max_items + 1);
        let (mut documents, request_charge) = self
            .timed("query documents", self.collect_query(sql, query.partition_key()))
            .await?;

        let continuation_token = if documents.len() > max_items {
            documents.truncate(max_items);
            Some(encode_continuation(offset + max_items as u64))
        } else {
            None
        };

        Ok(QueryPage {
            documents,
            continuation_token,
            request_charge,
        })
    }

    async fn count_documents(&self, query: &DocumentQuery) -> Result<u64> {
        let (values, charge) = self
            .timed(
                "count documents",
                self.collect_query(query.to_count_sql(), query.partition_key()),
            )
            .await?;
        crate::log_request_charge!("count", charge);

        values
            .first()
            .map_or(Ok(0), |v| {
                v.as_u64().ok_or_else(|| {
                    EntityStoreError::CosmosDb(CosmosDbError::DeserializationFailed(format!(
                        "Unexpected count result: {v}"
                    )))
                })
            })
    }
}

/// Factory creating [`CosmosDocumentClient`] handles from configuration
#[derive(Debug, Clone)]
pub struct CosmosClientFactory {
    config: CosmosDbConfig,
}

impl CosmosClientFactory {
    pub fn new(config: CosmosDbConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DocumentClientFactory for CosmosClientFactory {
    async fn connect(&self) -> Result<Arc<dyn DocumentClient>> {
        tracing::info!(
            endpoint = %self.config.endpoint,
            database = %self.config.database_id,
            collection = %self.config.collection_id,
            "Creating Cosmos DB client"
        );
        Ok(Arc::new(CosmosDocumentClient::new(self.config.clone())?))
    }
}
