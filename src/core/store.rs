//! Typed entity store
//!
//! Every call resolves the partition key of `T` through the [`TypeKeyCache`],
//! scopes its request to that partition and runs through the provider's
//! throttle-retry wrapper. Validation failures return before any request.

use crate::config::{BulkConfig, EntityStoreConfig, StoreConfig, UpsertStrategy};
use crate::core::bulk::{BulkImportResult, BulkImporter, PreparedDocument};
use crate::core::cancel::CancellationSignal;
use crate::core::cursor::QueryCursor;
use crate::core::provider::ConnectionProvider;
use crate::core::type_keys::TypeKeyCache;
use crate::domain::context::ResultExt;
use crate::domain::entity::{Entity, ENTITY_TYPE_FIELD, ID_FIELD};
use crate::domain::ids::{EntityId, TypeKey};
use crate::domain::paging::{PagedLoadingParameters, PagedResults};
use crate::domain::query::{DocumentQuery, Filter};
use crate::domain::{EntityStoreError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type UpsertLocks = Mutex<HashMap<(TypeKey, String), Arc<tokio::sync::Mutex<()>>>>;

/// Typed CRUD, query and bulk surface over one collection
pub struct EntityStore {
    provider: Arc<ConnectionProvider>,
    type_keys: Arc<TypeKeyCache>,
    settings: StoreConfig,
    importer: BulkImporter,
    upsert_locks: UpsertLocks,
}

impl EntityStore {
    pub fn new(
        provider: Arc<ConnectionProvider>,
        type_keys: Arc<TypeKeyCache>,
        settings: StoreConfig,
        bulk: BulkConfig,
    ) -> Self {
        let importer = BulkImporter::new(Arc::clone(&provider), bulk);
        Self {
            provider,
            type_keys,
            settings,
            importer,
            upsert_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Store backed by the provider and settings of a loaded configuration
    pub fn from_config(config: &EntityStoreConfig, type_keys: TypeKeyCache) -> Self {
        Self::new(
            Arc::new(ConnectionProvider::from_config(config)),
            Arc::new(type_keys),
            config.store.clone(),
            config.bulk.clone(),
        )
    }

    pub fn provider(&self) -> &Arc<ConnectionProvider> {
        &self.provider
    }

    pub fn type_keys(&self) -> &TypeKeyCache {
        &self.type_keys
    }

    /// Point read; `Ok(None)` when no document has this id in `T`'s partition
    pub async fn load_item<T: Entity>(
        &self,
        id: &str,
        cancel: Option<&CancellationSignal>,
    ) -> Result<Option<T>> {
        let id = validate_id(id)?;
        let key = self.type_keys.key_for::<T>()?;
        let (key_ref, id_ref) = (&key, id.as_str());

        let document = self
            .provider
            .execute_with_retry("load_item", cancel, |client| async move {
                client.read_document(key_ref, id_ref).await
            })
            .await?;

        match document {
            Some(document) => Ok(Some(from_document(document, &key)?)),
            None => {
                tracing::debug!(entity_type = %key, entity_id = %id, "Item not found");
                Ok(None)
            }
        }
    }

    /// Every item of type `T`
    pub async fn load_items<T: Entity>(&self, cancel: Option<&CancellationSignal>) -> Result<Vec<T>> {
        let key = self.type_keys.key_for::<T>()?;
        self.collect(DocumentQuery::partition(key), cancel).await
    }

    /// Items of type `T` matching `filter`
    pub async fn load_items_where<T: Entity>(
        &self,
        filter: Filter,
        cancel: Option<&CancellationSignal>,
    ) -> Result<Vec<T>> {
        let key = self.type_keys.key_for::<T>()?;
        let query = DocumentQuery::partition(key).filter(filter);
        query.validate()?;
        self.collect(query, cancel).await
    }

    async fn collect<T: Entity>(
        &self,
        query: DocumentQuery,
        cancel: Option<&CancellationSignal>,
    ) -> Result<Vec<T>> {
        let key = query.partition_key().clone();
        let documents = QueryCursor::new(&self.provider, query, self.settings.query_page_size, cancel)
            .collect_all()
            .await?;

        tracing::debug!(entity_type = %key, count = documents.len(), "Loaded items");
        documents
            .into_iter()
            .map(|document| from_document(document, &key))
            .collect()
    }

    /// One page of items plus the total count of matching items
    ///
    /// The count and the page share the same filter. A non-empty
    /// continuation token resumes the scan; otherwise `page - 1` pages are
    /// skipped first.
    pub async fn load_paged<T: Entity>(
        &self,
        params: &PagedLoadingParameters<T>,
        cancel: Option<&CancellationSignal>,
    ) -> Result<PagedResults<T>> {
        params.validate()?;
        let key = self.type_keys.key_for::<T>()?;

        let mut query = DocumentQuery::partition(key.clone());
        if let Some(filter) = &params.filter {
            query = query.filter(filter.clone());
        }
        if let Some(order_by) = &params.order_by {
            query = query.order_by(order_by.clone());
        }
        query.validate()?;

        let count_query = &query;
        let total_count = self
            .provider
            .execute_with_retry("count_documents", cancel, |client| async move {
                client.count_documents(count_query).await
            })
            .await?;

        let mut cursor = QueryCursor::new(&self.provider, query.clone(), params.page_size, cancel);
        match params.resume_token() {
            Some(token) => cursor = cursor.resume_from(Some(token)),
            None if params.page > 1 => cursor.skip_pages(params.page - 1).await?,
            None => {}
        }
        let (documents, continuation_token) = cursor.into_page().await?;

        let results = documents
            .into_iter()
            .map(|document| from_document(document, &key))
            .collect::<Result<Vec<T>>>()?;

        tracing::debug!(
            entity_type = %key,
            page = params.page,
            page_size = params.page_size,
            result_count = results.len(),
            total_count,
            has_more = continuation_token.is_some(),
            "Loaded page"
        );

        Ok(PagedResults {
            result_count: results.len(),
            results,
            total_count,
            page: params.page,
            page_size: params.page_size,
            continuation_token,
        })
    }

    /// Create `item`; fails with a conflict if its id already exists
    pub async fn insert<T: Entity>(&self, item: &T, cancel: Option<&CancellationSignal>) -> Result<()> {
        let key = self.type_keys.key_for::<T>()?;
        let (id, document) = to_document(item, &key)?;
        self.create(&key, &id, document, cancel).await
    }

    /// Replace `item`; fails with `DocumentNotFound` if it does not exist
    pub async fn update<T: Entity>(&self, item: &T, cancel: Option<&CancellationSignal>) -> Result<()> {
        let key = self.type_keys.key_for::<T>()?;
        let (id, document) = to_document(item, &key)?;
        self.replace(&key, &id, document, cancel).await
    }

    /// Create or replace `item`
    ///
    /// With the `check_then_write` strategy the existence check and the
    /// write are two requests. A concurrent writer between them can cause a
    /// conflict or a lost update unless `serialize_upserts` is on, and even
    /// then only writers inside this process are serialized.
    pub async fn insert_or_update<T: Entity>(
        &self,
        item: &T,
        cancel: Option<&CancellationSignal>,
    ) -> Result<()> {
        let key = self.type_keys.key_for::<T>()?;
        let (id, document) = to_document(item, &key)?;

        match self.settings.upsert_strategy {
            UpsertStrategy::Native => {
                let (key_ref, document) = (&key, &document);
                let response = self
                    .provider
                    .execute_with_retry("upsert", cancel, |client| {
                        let document = document.clone();
                        async move { client.upsert_document(key_ref, document).await }
                    })
                    .await?;
                crate::log_request_charge!("upsert", response.request_charge);
                tracing::debug!(entity_type = %key, entity_id = %id, "Item upserted");
                Ok(())
            }
            UpsertStrategy::CheckThenWrite => {
                let lock = self
                    .settings
                    .serialize_upserts
                    .then(|| self.upsert_lock(&key, id.as_str()));
                let _held = match &lock {
                    Some(lock) => Some(lock.lock().await),
                    None => None,
                };

                if self.provider.exists_document(&key, id.as_str(), cancel).await? {
                    self.replace(&key, &id, document, cancel).await
                } else {
                    self.create(&key, &id, document, cancel).await
                }
            }
        }
    }

    /// Delete by id; `DocumentNotFound` when nothing had this id
    pub async fn delete_item<T: Entity>(
        &self,
        id: &str,
        cancel: Option<&CancellationSignal>,
    ) -> Result<()> {
        let id = validate_id(id)?;
        let key = self.type_keys.key_for::<T>()?;
        let (key_ref, id_ref) = (&key, id.as_str());

        let response = self
            .provider
            .execute_with_retry("delete", cancel, |client| async move {
                client.delete_document(key_ref, id_ref).await
            })
            .await?;

        crate::log_request_charge!("delete", response.request_charge);
        tracing::debug!(entity_type = %key, entity_id = %id, "Item deleted");
        Ok(())
    }

    /// Import `items`, failing the batch if any item was rejected
    ///
    /// On the `bulk` strategy the accepted items stay written even when the
    /// call fails. On the `sequential` strategy items before the first
    /// failure stay written.
    pub async fn bulk_insert<T: Entity>(
        &self,
        items: &[T],
        cancel: Option<&CancellationSignal>,
    ) -> Result<BulkImportResult> {
        let result = self.bulk_import(items, cancel).await?;
        if !result.is_complete() {
            return Err(result.to_error(items.len()));
        }
        Ok(result)
    }

    /// Import `items` and report the structured outcome
    ///
    /// Items that fail validation are reported as bad documents instead of
    /// failing the call.
    pub async fn bulk_import<T: Entity>(
        &self,
        items: &[T],
        cancel: Option<&CancellationSignal>,
    ) -> Result<BulkImportResult> {
        let key = self.type_keys.key_for::<T>()?;
        let documents = items
            .iter()
            .enumerate()
            .map(|(index, item)| prepare(index, item, &key))
            .collect();

        self.importer.import(&key, documents, cancel).await
    }

    async fn create(
        &self,
        key: &TypeKey,
        id: &EntityId,
        document: Value,
        cancel: Option<&CancellationSignal>,
    ) -> Result<()> {
        let document = &document;
        let response = self
            .provider
            .execute_with_retry("insert", cancel, |client| {
                let document = document.clone();
                async move { client.create_document(key, document).await }
            })
            .await?;

        crate::log_request_charge!("insert", response.request_charge);
        tracing::debug!(entity_type = %key, entity_id = %id, "Item inserted");
        Ok(())
    }

    async fn replace(
        &self,
        key: &TypeKey,
        id: &EntityId,
        document: Value,
        cancel: Option<&CancellationSignal>,
    ) -> Result<()> {
        let (document, id_ref) = (&document, id.as_str());
        let response = self
            .provider
            .execute_with_retry("update", cancel, |client| {
                let document = document.clone();
                async move { client.replace_document(key, id_ref, document).await }
            })
            .await?;

        crate::log_request_charge!("update", response.request_charge);
        tracing::debug!(entity_type = %key, entity_id = %id, "Item updated");
        Ok(())
    }

    /// Per (type, id) mutex; idle entries are dropped on each acquisition
    fn upsert_lock(&self, key: &TypeKey, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .upsert_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(
            locks
                .entry((key.clone(), id.to_string()))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

fn validate_id(id: &str) -> Result<EntityId> {
    EntityId::new(id).map_err(EntityStoreError::Validation)
}

/// Serialize `item` and stamp its id and type key
fn to_document<T: Entity>(item: &T, key: &TypeKey) -> Result<(EntityId, Value)> {
    let id = validate_id(item.entity_id())?;

    let declared = item.entity_type();
    if !declared.is_empty() && declared != key.as_str() {
        return Err(EntityStoreError::Validation(format!(
            "entity '{id}' declares type '{declared}' but '{}' is registered as '{key}'",
            T::TYPE_TAG
        )));
    }

    let mut document = serde_json::to_value(item)
        .with_context(|| format!("Failed to serialize {} '{id}'", T::TYPE_TAG))?;
    let Some(fields) = document.as_object_mut() else {
        return Err(EntityStoreError::Validation(format!(
            "{} must serialize to a JSON object",
            T::TYPE_TAG
        )));
    };

    fields.insert(ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
    fields.insert(
        ENTITY_TYPE_FIELD.to_string(),
        Value::String(key.as_str().to_string()),
    );
    Ok((id, document))
}

fn from_document<T: Entity>(document: Value, key: &TypeKey) -> Result<T> {
    serde_json::from_value(document).with_context(|| format!("Failed to read '{key}' document"))
}

fn prepare<T: Entity>(index: usize, item: &T, key: &TypeKey) -> PreparedDocument {
    let id = Some(item.entity_id().to_string()).filter(|id| !id.trim().is_empty());
    PreparedDocument {
        index,
        id,
        body: to_document(item, key)
            .map(|(_, document)| document)
            .map_err(|e| e.to_string()),
    }
}
