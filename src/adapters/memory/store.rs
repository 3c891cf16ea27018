//! In-memory document database
//!
//! An account holds databases, collections and partitioned documents behind
//! one mutex. Every handle created from the same [`InMemoryClientFactory`]
//! shares the account, so a handle recreated after a destructive operation
//! sees the same data. Throttling can be injected to exercise retry paths.

use crate::adapters::document::continuation::{decode_continuation, encode_continuation};
use crate::adapters::document::traits::{
    DocumentClient, DocumentClientFactory, PageRequest, QueryPage, WriteResponse,
};
use crate::adapters::memory::evaluator::{matches, sort_documents};
use crate::domain::entity::ID_FIELD;
use crate::domain::ids::TypeKey;
use crate::domain::query::DocumentQuery;
use crate::domain::{CosmosDbError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const READ_CHARGE: f64 = 1.0;
const WRITE_CHARGE: f64 = 5.0;
const QUERY_CHARGE: f64 = 2.5;

/// Throughput assigned to a freshly created collection
const DEFAULT_THROUGHPUT: u32 = 400;

#[derive(Debug, Default)]
struct CollectionState {
    partition_key_path: String,
    throughput: u32,
    /// Keyed by (partition key, id)
    documents: BTreeMap<(String, String), Value>,
}

#[derive(Debug, Default)]
struct DatabaseState {
    collections: BTreeMap<String, CollectionState>,
}

#[derive(Debug, Clone, Copy)]
struct ThrottlePlan {
    remaining: usize,
    retry_after: Option<Duration>,
}

#[derive(Debug, Default)]
struct AccountState {
    databases: BTreeMap<String, DatabaseState>,
    throttle: Option<ThrottlePlan>,
    request_count: u64,
    throttled_count: u64,
    connections: u64,
}

/// Shared in-memory account
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccount {
    inner: Arc<Mutex<AccountState>>,
}

impl InMemoryAccount {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the next `count` requests with a throttling error
    ///
    /// `retry_after` is the hint carried by each throttled response.
    pub fn throttle_next(&self, count: usize, retry_after: Option<Duration>) {
        self.lock().throttle = (count > 0).then_some(ThrottlePlan {
            remaining: count,
            retry_after,
        });
    }

    /// Requests received, throttled ones included
    pub fn request_count(&self) -> u64 {
        self.lock().request_count
    }

    /// Requests rejected with a throttling error
    pub fn throttled_count(&self) -> u64 {
        self.lock().throttled_count
    }

    /// Handles created by factories bound to this account
    pub fn connections(&self) -> u64 {
        self.lock().connections
    }

    /// Documents stored in a collection, all partitions
    pub fn document_count(&self, database_id: &str, collection_id: &str) -> usize {
        self.lock()
            .databases
            .get(database_id)
            .and_then(|db| db.collections.get(collection_id))
            .map_or(0, |coll| coll.documents.len())
    }

    /// Provisioned throughput of a collection
    pub fn throughput(&self, database_id: &str, collection_id: &str) -> Option<u32> {
        self.lock()
            .databases
            .get(database_id)
            .and_then(|db| db.collections.get(collection_id))
            .map(|coll| coll.throughput)
    }

    /// Counts the request and applies any pending throttle
    fn begin_request(&self) -> Result<MutexGuard<'_, AccountState>> {
        let mut state = self.lock();
        state.request_count += 1;

        if let Some(plan) = state.throttle.as_mut() {
            let retry_after = plan.retry_after;
            plan.remaining -= 1;
            if plan.remaining == 0 {
                state.throttle = None;
            }
            state.throttled_count += 1;
            return Err(CosmosDbError::Throttled {
                retry_after,
                message: "Request rate is large".to_string(),
            }
            .into());
        }

        Ok(state)
    }
}

/// Document client over an [`InMemoryAccount`]
#[derive(Debug, Clone)]
pub struct InMemoryDocumentClient {
    account: InMemoryAccount,
    database_id: String,
    collection_id: String,
}

impl InMemoryDocumentClient {
    pub fn new(
        account: InMemoryAccount,
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            account,
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }

    /// Runs `f` against the bound collection inside one counted request
    fn with_collection<R>(&self, f: impl FnOnce(&mut CollectionState) -> Result<R>) -> Result<R> {
        let mut state = self.account.begin_request()?;
        let database = state
            .databases
            .get_mut(&self.database_id)
            .ok_or_else(|| CosmosDbError::DatabaseNotFound(self.database_id.clone()))?;
        let collection = database
            .collections
            .get_mut(&self.collection_id)
            .ok_or_else(|| CosmosDbError::CollectionNotFound(self.collection_link()))?;
        f(collection)
    }

    /// Matching documents of the query's partition, filtered and ordered
    fn select(collection: &CollectionState, query: &DocumentQuery) -> Vec<Value> {
        let partition = query.partition_key().as_str();
        let mut selected: Vec<Value> = collection
            .documents
            .range((partition.to_string(), String::new())..)
            .take_while(|((pk, _), _)| pk == partition)
            .filter(|((_, id), _)| query.id().map_or(true, |wanted| wanted == id))
            .filter(|(_, doc)| query.filter_expr().map_or(true, |f| matches(f, doc)))
            .map(|(_, doc)| doc.clone())
            .collect();

        if let Some(order_by) = query.ordering() {
            sort_documents(&mut selected, order_by);
        }
        selected
    }
}

fn document_id(document: &Value) -> Result<String> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CosmosDbError::InvalidRequest(format!("Document has no string '{ID_FIELD}' field"))
                .into()
        })
}

/// Rejects documents whose partition key value differs from the target partition
fn check_partition(path: &str, partition_key: &TypeKey, document: &Value) -> Result<()> {
    let value = path
        .trim_start_matches('/')
        .split('/')
        .try_fold(document, |current, segment| current.get(segment))
        .and_then(Value::as_str);

    if value != Some(partition_key.as_str()) {
        return Err(CosmosDbError::InvalidRequest(format!(
            "Partition key '{}' does not match the document value at '{}' ({:?})",
            partition_key, path, value
        ))
        .into());
    }
    Ok(())
}

/// Adds `_ts` and `_etag` the way the service does
fn stamp_system_properties(document: &mut Value) {
    if let Some(map) = document.as_object_mut() {
        map.insert(
            "_ts".to_string(),
            Value::from(chrono::Utc::now().timestamp()),
        );
        map.insert(
            "_etag".to_string(),
            Value::from(format!("\"{}\"", uuid::Uuid::new_v4())),
        );
    }
}

fn written() -> WriteResponse {
    WriteResponse {
        request_charge: WRITE_CHARGE,
    }
}

#[async_trait]
impl DocumentClient for InMemoryDocumentClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn database_id(&self) -> &str {
        &self.database_id
    }

    fn collection_id(&self) -> &str {
        &self.collection_id
    }

    async fn database_exists(&self) -> Result<bool> {
        let state = self.account.begin_request()?;
        Ok(state.databases.contains_key(&self.database_id))
    }

    async fn create_database(&self) -> Result<()> {
        let mut state = self.account.begin_request()?;
        if state.databases.contains_key(&self.database_id) {
            return Err(CosmosDbError::Conflict(format!(
                "Database '{}' already exists",
                self.database_id
            ))
            .into());
        }
        state
            .databases
            .insert(self.database_id.clone(), DatabaseState::default());
        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool> {
        let state = self.account.begin_request()?;
        Ok(state
            .databases
            .get(&self.database_id)
            .is_some_and(|db| db.collections.contains_key(&self.collection_id)))
    }

    async fn create_collection(&self, partition_key_path: &str) -> Result<()> {
        let mut state = self.account.begin_request()?;
        let database = state
            .databases
            .get_mut(&self.database_id)
            .ok_or_else(|| CosmosDbError::DatabaseNotFound(self.database_id.clone()))?;

        if database.collections.contains_key(&self.collection_id) {
            return Err(CosmosDbError::Conflict(format!(
                "Collection '{}' already exists",
                self.collection_id
            ))
            .into());
        }

        database.collections.insert(
            self.collection_id.clone(),
            CollectionState {
                partition_key_path: partition_key_path.to_string(),
                throughput: DEFAULT_THROUGHPUT,
                documents: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn replace_throughput(&self, throughput: u32) -> Result<()> {
        self.with_collection(|collection| {
            collection.throughput = throughput;
            Ok(())
        })
    }

    async fn delete_collection(&self) -> Result<()> {
        let mut state = self.account.begin_request()?;
        let removed = state
            .databases
            .get_mut(&self.database_id)
            .and_then(|db| db.collections.remove(&self.collection_id));

        match removed {
            Some(_) => Ok(()),
            None => Err(CosmosDbError::CollectionNotFound(self.collection_link()).into()),
        }
    }

    async fn read_document(&self, partition_key: &TypeKey, id: &str) -> Result<Option<Value>> {
        self.with_collection(|collection| {
            Ok(collection
                .documents
                .get(&(partition_key.to_string(), id.to_string()))
                .cloned())
        })
    }

    async fn create_document(
        &self,
        partition_key: &TypeKey,
        mut document: Value,
    ) -> Result<WriteResponse> {
        let id = document_id(&document)?;
        self.with_collection(|collection| {
            check_partition(&collection.partition_key_path, partition_key, &document)?;
            let key = (partition_key.to_string(), id);
            if collection.documents.contains_key(&key) {
                return Err(CosmosDbError::Conflict(format!(
                    "Document '{}' already exists in partition '{}'",
                    key.1, key.0
                ))
                .into());
            }
            stamp_system_properties(&mut document);
            collection.documents.insert(key, document);
            Ok(written())
        })
    }

    async fn replace_document(
        &self,
        partition_key: &TypeKey,
        id: &str,
        mut document: Value,
    ) -> Result<WriteResponse> {
        if document_id(&document)? != id {
            return Err(CosmosDbError::InvalidRequest(format!(
                "Replacement body id does not match '{id}'"
            ))
            .into());
        }
        self.with_collection(|collection| {
            check_partition(&collection.partition_key_path, partition_key, &document)?;
            let slot = collection
                .documents
                .get_mut(&(partition_key.to_string(), id.to_string()))
                .ok_or_else(|| CosmosDbError::DocumentNotFound(id.to_string()))?;
            stamp_system_properties(&mut document);
            *slot = document;
            Ok(written())
        })
    }

    async fn upsert_document(
        &self,
        partition_key: &TypeKey,
        mut document: Value,
    ) -> Result<WriteResponse> {
        let id = document_id(&document)?;
        self.with_collection(|collection| {
            check_partition(&collection.partition_key_path, partition_key, &document)?;
            stamp_system_properties(&mut document);
            collection
                .documents
                .insert((partition_key.to_string(), id), document);
            Ok(written())
        })
    }

    async fn delete_document(&self, partition_key: &TypeKey, id: &str) -> Result<WriteResponse> {
        self.with_collection(|collection| {
            collection
                .documents
                .remove(&(partition_key.to_string(), id.to_string()))
                .map(|_| written())
                .ok_or_else(|| CosmosDbError::DocumentNotFound(id.to_string()).into())
        })
    }

    async fn query_documents(
        &self,
        query: &DocumentQuery,
        page: &PageRequest,
    ) -> Result<QueryPage> {
        let offset = decode_continuation(page.continuation_token.as_deref())?;
        let max_items = page.max_items.max(1);

        self.with_collection(|collection| {
            let mut documents: Vec<Value> = Self::select(collection, query)
                .into_iter()
                .skip(offset as usize)
                .take(max_items + 1)
                .collect();

            let continuation_token = if documents.len() > max_items {
                documents.truncate(max_items);
                Some(encode_continuation(offset + max_items as u64))
            } else {
                None
            };

            Ok(QueryPage {
                documents,
                continuation_token,
                request_charge: QUERY_CHARGE,
            })
        })
    }

    async fn count_documents(&self, query: &DocumentQuery) -> Result<u64> {
        self.with_collection(|collection| Ok(Self::select(collection, query).len() as u64))
    }
}

/// Factory handing out clients over one shared account
#[derive(Debug, Clone)]
pub struct InMemoryClientFactory {
    account: InMemoryAccount,
    database_id: String,
    collection_id: String,
}

impl InMemoryClientFactory {
    /// Factory over a fresh, empty account
    pub fn new(database_id: &str, collection_id: &str) -> Self {
        Self::with_account(InMemoryAccount::new(), database_id, collection_id)
    }

    /// Factory over an existing account
    pub fn with_account(account: InMemoryAccount, database_id: &str, collection_id: &str) -> Self {
        Self {
            account,
            database_id: database_id.to_string(),
            collection_id: collection_id.to_string(),
        }
    }

    pub fn account(&self) -> &InMemoryAccount {
        &self.account
    }
}

#[async_trait]
impl DocumentClientFactory for InMemoryClientFactory {
    async fn connect(&self) -> Result<Arc<dyn DocumentClient>> {
        self.account.lock().connections += 1;
        tracing::debug!(
            database = %self.database_id,
            collection = %self.collection_id,
            "Connected to in-memory account"
        );
        Ok(Arc::new(InMemoryDocumentClient::new(
            self.account.clone(),
            self.database_id.clone(),
            self.collection_id.clone(),
        )))
    }
}
