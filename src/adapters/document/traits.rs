//! Document database abstraction traits
//!
//! This module defines the seam between the entity store and a concrete
//! document database. Backends speak JSON documents and partition keys; they
//! know nothing about entity types.

use crate::domain::ids::TypeKey;
use crate::domain::query::DocumentQuery;
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Window requested from a partition-scoped query
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// Token returned by the previous page; `None` starts at the beginning
    pub continuation_token: Option<String>,

    /// Maximum documents returned by this call
    pub max_items: usize,
}

impl PageRequest {
    pub fn first(max_items: usize) -> Self {
        Self {
            continuation_token: None,
            max_items,
        }
    }

    pub fn resume(continuation_token: Option<String>, max_items: usize) -> Self {
        Self {
            continuation_token,
            max_items,
        }
    }
}

/// One page of raw documents
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Documents in query order
    pub documents: Vec<Value>,

    /// Token for the next page, present only when more documents exist
    pub continuation_token: Option<String>,

    /// Request units charged for this page
    pub request_charge: f64,
}

/// Outcome of a single-document write
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WriteResponse {
    /// Request units charged for the write
    pub request_charge: f64,
}

/// Document database client
///
/// One handle is bound to one database and one collection. Every document
/// operation takes the partition key explicitly, and queries carry it inside
/// the [`DocumentQuery`], so no call can fan out across partitions.
///
/// Throttling is reported as
/// [`CosmosDbError::Throttled`](crate::domain::CosmosDbError::Throttled);
/// retrying is the caller's decision.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Database id this handle is bound to
    fn database_id(&self) -> &str;

    /// Collection id this handle is bound to
    fn collection_id(&self) -> &str;

    /// Link of the collection, `dbs/{db}/colls/{coll}`
    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id(), self.collection_id())
    }

    /// Link of a document, `dbs/{db}/colls/{coll}/docs/{id}`
    fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.collection_link(), id)
    }

    /// Whether the database exists
    async fn database_exists(&self) -> Result<bool>;

    /// Create the database
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if it already exists.
    async fn create_database(&self) -> Result<()>;

    /// Whether the collection exists
    async fn collection_exists(&self) -> Result<bool>;

    /// Create the collection partitioned on `partition_key_path`
    async fn create_collection(&self, partition_key_path: &str) -> Result<()>;

    /// Replace the provisioned throughput of the collection
    async fn replace_throughput(&self, throughput: u32) -> Result<()>;

    /// Delete the collection with every document in it
    async fn delete_collection(&self) -> Result<()>;

    /// Point read; `Ok(None)` when the document does not exist
    async fn read_document(&self, partition_key: &TypeKey, id: &str) -> Result<Option<Value>>;

    /// Create a document; `Conflict` if the id exists in the partition
    async fn create_document(&self, partition_key: &TypeKey, document: Value)
        -> Result<WriteResponse>;

    /// Replace a document; `DocumentNotFound` if it does not exist
    async fn replace_document(
        &self,
        partition_key: &TypeKey,
        id: &str,
        document: Value,
    ) -> Result<WriteResponse>;

    /// Create or replace a document atomically
    async fn upsert_document(&self, partition_key: &TypeKey, document: Value)
        -> Result<WriteResponse>;

    /// Delete a document; `DocumentNotFound` if it does not exist
    async fn delete_document(&self, partition_key: &TypeKey, id: &str) -> Result<WriteResponse>;

    /// Fetch one window of a partition-scoped query
    async fn query_documents(&self, query: &DocumentQuery, page: &PageRequest)
        -> Result<QueryPage>;

    /// Count the documents matching a partition-scoped query
    async fn count_documents(&self, query: &DocumentQuery) -> Result<u64>;
}

/// Creates document client handles
///
/// The connection provider calls `connect` lazily on first use and again
/// after a destructive operation dropped the previous handle.
#[async_trait]
pub trait DocumentClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn DocumentClient>>;
}
