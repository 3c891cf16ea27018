//! Connection provider
//!
//! Owns the lazily created document client and the provisioning state of the
//! database and collection, and wraps every store call in the throttle-retry
//! loop.
//!
//! Provisioning runs under one async mutex, so concurrent first callers wait
//! for a single pass:
//!
//! ```text
//! Uninitialized -> Connected -> DatabaseReady -> CollectionReady -> Provisioned
//! ```
//!
//! `clear_database` deletes the collection and returns to `Uninitialized`.

use crate::adapters::document::{create_client_factory, DocumentClient, DocumentClientFactory};
use crate::config::{CosmosDbConfig, EntityStoreConfig};
use crate::core::cancel::{ensure_not_cancelled, CancellationSignal};
use crate::core::cursor::QueryCursor;
use crate::core::retry::{retry_throttled, RetryOverride, RetryOverrideGuard};
use crate::domain::entity::PARTITION_KEY_PATH;
use crate::domain::ids::TypeKey;
use crate::domain::query::DocumentQuery;
use crate::domain::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Provisioning progress of a [`ConnectionProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No client handle yet
    Uninitialized,
    /// Client handle created
    Connected,
    /// Database known to exist
    DatabaseReady,
    /// Collection known to exist
    CollectionReady,
    /// Throughput settled; ready for document traffic
    Provisioned,
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisioningState::Uninitialized => "uninitialized",
            ProvisioningState::Connected => "connected",
            ProvisioningState::DatabaseReady => "database-ready",
            ProvisioningState::CollectionReady => "collection-ready",
            ProvisioningState::Provisioned => "provisioned",
        };
        write!(f, "{name}")
    }
}

struct ProviderState {
    phase: ProvisioningState,
    client: Option<Arc<dyn DocumentClient>>,
}

/// Lazily connected, self-provisioning access to one collection
pub struct ConnectionProvider {
    factory: Arc<dyn DocumentClientFactory>,
    options: CosmosDbConfig,
    default_retry_after: Duration,
    state: Mutex<ProviderState>,
    retry_override: RetryOverride,
}

impl ConnectionProvider {
    /// Create a provider; no I/O happens until the first call
    pub fn new(factory: Arc<dyn DocumentClientFactory>, options: CosmosDbConfig) -> Self {
        Self {
            factory,
            options,
            default_retry_after: Duration::from_millis(1000),
            state: Mutex::new(ProviderState {
                phase: ProvisioningState::Uninitialized,
                client: None,
            }),
            retry_override: RetryOverride::new(),
        }
    }

    /// Provider for the backend and options named by the configuration
    pub fn from_config(config: &EntityStoreConfig) -> Self {
        Self::new(create_client_factory(config), config.cosmosdb.clone())
            .with_default_retry_after(Duration::from_millis(config.store.default_retry_after_ms))
    }

    /// Backoff applied to throttled responses without a retry-after hint
    pub fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }

    pub fn options(&self) -> &CosmosDbConfig {
        &self.options
    }

    /// Current provisioning state
    pub async fn state(&self) -> ProvisioningState {
        self.state.lock().await.phase
    }

    /// Provision the database and collection if needed
    ///
    /// Idempotent: once provisioned, further calls return the cached handle
    /// without any request. Throughput is replaced only when this call created
    /// the collection or `scale_offer_throughput` is set.
    pub async fn provision(&self) -> Result<Arc<dyn DocumentClient>> {
        self.provision_with(None).await
    }

    /// Provisioning that stops at the next request or throttle wait once
    /// `cancel` fires
    async fn provision_with(
        &self,
        cancel: Option<&CancellationSignal>,
    ) -> Result<Arc<dyn DocumentClient>> {
        let mut state = self.state.lock().await;

        if state.phase == ProvisioningState::Provisioned {
            if let Some(client) = &state.client {
                return Ok(Arc::clone(client));
            }
        }

        let client = self.connect_locked(&mut state).await?;
        let database = &self.options.database_id;
        let collection = &self.options.collection_id;

        if !self
            .retrying("database_exists", cancel, || client.database_exists())
            .await?
        {
            tracing::info!(database = %database, "Database not found, creating");
            tolerate_conflict(
                self.retrying("create_database", cancel, || client.create_database())
                    .await,
            )?;
        }
        state.phase = ProvisioningState::DatabaseReady;

        let mut created = false;
        if !self
            .retrying("collection_exists", cancel, || client.collection_exists())
            .await?
        {
            tracing::info!(collection = %collection, partition_key = PARTITION_KEY_PATH, "Collection not found, creating");
            created = tolerate_conflict(
                self.retrying("create_collection", cancel, || {
                    client.create_collection(PARTITION_KEY_PATH)
                })
                .await,
            )?;
        }
        state.phase = ProvisioningState::CollectionReady;

        if created || self.options.scale_offer_throughput {
            let throughput = self.options.offer_throughput;
            self.retrying("replace_throughput", cancel, || client.replace_throughput(throughput))
                .await?;
            tracing::info!(collection = %collection, throughput, "Offer throughput applied");
        }
        state.phase = ProvisioningState::Provisioned;

        tracing::info!(
            backend = client.backend_name(),
            collection = %client.collection_link(),
            "Collection provisioned"
        );
        Ok(client)
    }

    /// Provisioned client handle, provisioning on first use
    pub async fn client(&self) -> Result<Arc<dyn DocumentClient>> {
        self.provision().await
    }

    /// Client handle without provisioning, for inspection calls
    async fn connection(&self) -> Result<Arc<dyn DocumentClient>> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await
    }

    async fn connect_locked(&self, state: &mut ProviderState) -> Result<Arc<dyn DocumentClient>> {
        if let Some(client) = &state.client {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.connect().await?;
        state.client = Some(Arc::clone(&client));
        state.phase = ProvisioningState::Connected;
        Ok(client)
    }

    /// Provisioning and inspection steps always retry throttles
    async fn retrying<T, F, Fut>(
        &self,
        operation: &str,
        cancel: Option<&CancellationSignal>,
        call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_throttled(self.default_retry_after, cancel, operation, call).await
    }

    /// Whether the database exists; does not provision
    pub async fn database_exists(&self) -> Result<bool> {
        let client = self.connection().await?;
        self.retrying("database_exists", None, || client.database_exists())
            .await
    }

    /// Whether the collection exists; does not provision
    pub async fn collection_exists(&self) -> Result<bool> {
        let client = self.connection().await?;
        if !self
            .retrying("database_exists", None, || client.database_exists())
            .await?
        {
            return Ok(false);
        }
        self.retrying("collection_exists", None, || client.collection_exists())
            .await
    }

    /// Count of documents matching `query`; does not provision
    pub async fn count_documents(&self, query: &DocumentQuery) -> Result<u64> {
        let client = self.connection().await?;
        self.retrying("count_documents", None, || client.count_documents(query))
            .await
    }

    /// Existence query by id inside one partition
    pub async fn exists_document(
        &self,
        partition_key: &TypeKey,
        id: &str,
        cancel: Option<&CancellationSignal>,
    ) -> Result<bool> {
        let query = DocumentQuery::by_id(partition_key.clone(), id);
        let first = QueryCursor::new(self, query, 1, cancel).take_one().await?;
        Ok(first.is_some())
    }

    /// Link of the collection, `dbs/{db}/colls/{coll}`
    pub fn collection_link(&self) -> String {
        self.options.collection_link()
    }

    /// Link of a document, `dbs/{db}/colls/{coll}/docs/{id}`
    pub fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.collection_link(), id)
    }

    /// Delete the collection and force re-provisioning on next use
    ///
    /// Other providers sharing the collection keep their handles and are
    /// not notified.
    pub async fn clear_database(&self, cancel: Option<&CancellationSignal>) -> Result<()> {
        ensure_not_cancelled(cancel, "clear_database")?;
        let mut state = self.state.lock().await;
        let client = self.connect_locked(&mut state).await?;

        let deleted = retry_throttled(self.default_retry_after, cancel, "delete_collection", || {
            client.delete_collection()
        })
        .await;

        match deleted {
            Ok(()) => tracing::warn!(collection = %client.collection_link(), "Collection deleted"),
            Err(e) if e.is_not_found() => {
                tracing::info!(collection = %client.collection_link(), "Collection already absent")
            }
            Err(e) => return Err(e),
        }

        state.client = None;
        state.phase = ProvisioningState::Uninitialized;
        Ok(())
    }

    /// Run a store call through the throttle-retry wrapper
    ///
    /// The call receives the provisioned client and may run several times.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation: &str,
        cancel: Option<&CancellationSignal>,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut(Arc<dyn DocumentClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        ensure_not_cancelled(cancel, operation)?;
        let client = self.provision_with(cancel).await?;

        retry_throttled(self.default_retry_after, cancel, operation, || {
            call(Arc::clone(&client))
        })
        .await
    }

    /// Run a store call exactly once, handing throttles back to the caller
    ///
    /// Only the holder of a [`RetryOverrideGuard`] bypasses the wrapper;
    /// every other call on this provider keeps retrying.
    pub async fn execute_once<T, F, Fut>(
        &self,
        _scope: &RetryOverrideGuard,
        operation: &str,
        cancel: Option<&CancellationSignal>,
        call: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<dyn DocumentClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        ensure_not_cancelled(cancel, operation)?;
        let client = self.provision_with(cancel).await?;
        call(client).await
    }

    /// Open a single-attempt scope for [`execute_once`](Self::execute_once)
    pub fn suppress_retries(&self) -> RetryOverrideGuard {
        self.retry_override.suppress()
    }

    /// Whether any single-attempt scope is open
    pub fn retries_suppressed(&self) -> bool {
        self.retry_override.is_suppressed()
    }
}

/// Maps a conflict (created concurrently elsewhere) to `false`, success to `true`
fn tolerate_conflict(outcome: Result<()>) -> Result<bool> {
    match outcome {
        Ok(()) => Ok(true),
        Err(e) if e.is_conflict() => {
            tracing::debug!(error = %e, "Resource created concurrently");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryClientFactory;

    fn provider() -> (ConnectionProvider, InMemoryClientFactory) {
        let factory = InMemoryClientFactory::new("db", "coll");
        let options = CosmosDbConfig {
            database_id: "db".to_string(),
            collection_id: "coll".to_string(),
            offer_throughput: 800,
            ..Default::default()
        };
        let provider = ConnectionProvider::new(Arc::new(factory.clone()), options)
            .with_default_retry_after(Duration::from_millis(5));
        (provider, factory)
    }

    #[tokio::test]
    async fn test_new_does_no_io() {
        let (provider, factory) = provider();
        assert_eq!(provider.state().await, ProvisioningState::Uninitialized);
        assert_eq!(factory.account().request_count(), 0);
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let (provider, factory) = provider();
        provider.provision().await.unwrap();
        assert_eq!(provider.state().await, ProvisioningState::Provisioned);
        assert_eq!(factory.account().throughput("db", "coll"), Some(800));

        let requests = factory.account().request_count();
        provider.provision().await.unwrap();
        assert_eq!(factory.account().request_count(), requests);
    }

    #[tokio::test]
    async fn test_links() {
        let (provider, _) = provider();
        assert_eq!(provider.collection_link(), "dbs/db/colls/coll");
        assert_eq!(provider.document_link("a1"), "dbs/db/colls/coll/docs/a1");
    }

    #[tokio::test]
    async fn test_execute_once_skips_retry_only_inside_scope() {
        let (provider, factory) = provider();
        provider.provision().await.unwrap();

        let scope = provider.suppress_retries();
        factory.account().throttle_next(1, Some(Duration::from_millis(1)));
        let once = provider
            .execute_once(&scope, "exists", None, |client| async move {
                client.collection_exists().await
            })
            .await;
        assert!(once.unwrap_err().is_throttled());

        factory.account().throttle_next(1, Some(Duration::from_millis(1)));
        let retried = provider
            .execute_with_retry("exists", None, |client| async move {
                client.collection_exists().await
            })
            .await;
        assert!(retried.unwrap());
        assert!(provider.retries_suppressed());

        drop(scope);
        assert!(!provider.retries_suppressed());
    }

    #[test]
    fn test_tolerate_conflict() {
        use crate::domain::CosmosDbError;

        assert!(tolerate_conflict(Ok(())).unwrap());
        assert!(!tolerate_conflict(Err(CosmosDbError::Conflict("x".into()).into())).unwrap());
        assert!(tolerate_conflict(Err(CosmosDbError::QueryFailed("x".into()).into())).is_err());
    }
}
