//! Bulk import of prepared documents
//!
//! Two strategies:
//! - `bulk`: concurrent single-attempt upserts inside a retry override
//!   scope; the importer owns throttling backoff (exponential, jittered,
//!   bounded) and keeps going past rejected documents. Other callers of the
//!   same provider keep their retries.
//! - `sequential`: one create after the other through the retry wrapper,
//!   stopping at the first failure. Earlier documents stay written.

use crate::config::{BulkConfig, BulkStrategy};
use crate::core::cancel::{sleep_or_cancel, CancellationSignal};
use crate::core::provider::ConnectionProvider;
use crate::core::retry::RetryOverrideGuard;
use crate::domain::ids::TypeKey;
use crate::domain::{CosmosDbError, EntityStoreError, Result};
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A document ready for import, or the reason it could not be prepared
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Position in the submitted batch
    pub index: usize,
    /// Document id, when one could be read from the input
    pub id: Option<String>,
    pub body: std::result::Result<Value, String>,
}

/// A document the import rejected
#[derive(Debug, Clone, PartialEq)]
pub struct BadDocument {
    pub index: usize,
    pub id: Option<String>,
    pub error: String,
}

impl BadDocument {
    /// Id of the document, or `#<index>` when it has none
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("#{}", self.index))
    }
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default)]
pub struct BulkImportResult {
    /// Documents written
    pub documents_imported: usize,

    /// Request units charged by the writes
    pub request_units_consumed: f64,

    /// Wall time of the import
    pub elapsed: Duration,

    /// Rejected documents, ordered by batch position
    pub bad_documents: Vec<BadDocument>,
}

impl BulkImportResult {
    pub fn is_complete(&self) -> bool {
        self.bad_documents.is_empty()
    }

    /// Batch-level error for an import with rejected documents
    pub fn to_error(&self, total: usize) -> EntityStoreError {
        CosmosDbError::BulkImportFailed {
            imported: self.documents_imported,
            total,
            bad_documents: self.bad_documents.iter().map(BadDocument::label).collect(),
        }
        .into()
    }
}

/// Writes batches of documents into one partition
pub struct BulkImporter {
    provider: Arc<ConnectionProvider>,
    settings: BulkConfig,
}

impl BulkImporter {
    pub fn new(provider: Arc<ConnectionProvider>, settings: BulkConfig) -> Self {
        Self { provider, settings }
    }

    pub fn strategy(&self) -> BulkStrategy {
        self.settings.strategy
    }

    /// Import `documents` with the configured strategy
    ///
    /// # Errors
    ///
    /// Rejected documents are reported in the result, not as an error.
    /// Cancellation and provisioning failures abort the import.
    pub async fn import(
        &self,
        partition_key: &TypeKey,
        documents: Vec<PreparedDocument>,
        cancel: Option<&CancellationSignal>,
    ) -> Result<BulkImportResult> {
        let total = documents.len();
        let started = Instant::now();

        let mut result = match self.settings.strategy {
            BulkStrategy::Bulk => self.import_concurrent(partition_key, documents, cancel).await?,
            BulkStrategy::Sequential => {
                self.import_sequential(partition_key, documents, cancel)
                    .await?
            }
        };
        result.elapsed = started.elapsed();

        tracing::info!(
            entity_type = %partition_key,
            strategy = ?self.settings.strategy,
            total,
            imported = result.documents_imported,
            bad = result.bad_documents.len(),
            request_units = result.request_units_consumed,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Bulk import finished"
        );

        Ok(result)
    }

    async fn import_sequential(
        &self,
        partition_key: &TypeKey,
        documents: Vec<PreparedDocument>,
        cancel: Option<&CancellationSignal>,
    ) -> Result<BulkImportResult> {
        let mut result = BulkImportResult::default();

        for document in documents {
            let body = match document.body {
                Ok(body) => body,
                Err(error) => {
                    result.bad_documents.push(BadDocument {
                        index: document.index,
                        id: document.id,
                        error,
                    });
                    break;
                }
            };

            let body = &body;
            let written = self
                .provider
                .execute_with_retry("bulk_insert", cancel, |client| {
                    let body = body.clone();
                    async move { client.create_document(partition_key, body).await }
                })
                .await;

            match written {
                Ok(response) => {
                    result.documents_imported += 1;
                    result.request_units_consumed += response.request_charge;
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(index = document.index, error = %e, "Sequential import stopped");
                    result.bad_documents.push(BadDocument {
                        index: document.index,
                        id: document.id,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(result)
    }

    async fn import_concurrent(
        &self,
        partition_key: &TypeKey,
        documents: Vec<PreparedDocument>,
        cancel: Option<&CancellationSignal>,
    ) -> Result<BulkImportResult> {
        // Throttling is handled here, not by the provider
        let no_retry = self.provider.suppress_retries();
        let no_retry = &no_retry;
        let mut result = BulkImportResult::default();

        let mut valid = Vec::with_capacity(documents.len());
        for document in documents {
            match document.body {
                Ok(body) => valid.push((document.index, document.id, body)),
                Err(error) => result.bad_documents.push(BadDocument {
                    index: document.index,
                    id: document.id,
                    error,
                }),
            }
        }

        let outcomes: Vec<(usize, Option<String>, Result<f64>)> = stream::iter(valid)
            .map(|(index, id, body)| async move {
                let outcome = self
                    .upsert_with_backoff(no_retry, partition_key, &body, cancel)
                    .await;
                (index, id, outcome)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        for (index, id, outcome) in outcomes {
            match outcome {
                Ok(charge) => {
                    result.documents_imported += 1;
                    result.request_units_consumed += charge;
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => result.bad_documents.push(BadDocument {
                    index,
                    id,
                    error: e.to_string(),
                }),
            }
        }

        result.bad_documents.sort_by_key(|bad| bad.index);
        Ok(result)
    }

    /// Upsert one document, backing off on throttling up to `max_retries`
    async fn upsert_with_backoff(
        &self,
        scope: &RetryOverrideGuard,
        partition_key: &TypeKey,
        body: &Value,
        cancel: Option<&CancellationSignal>,
    ) -> Result<f64> {
        let mut retry_count = 0;
        let mut delay_ms = self.settings.initial_backoff_ms;

        loop {
            let written = self
                .provider
                .execute_once(scope, "bulk_upsert", cancel, |client| {
                    let body = body.clone();
                    async move { client.upsert_document(partition_key, body).await }
                })
                .await;

            match written {
                Ok(response) => return Ok(response.request_charge),
                Err(e) if e.is_throttled() && retry_count < self.settings.max_retries => {
                    let backoff = Duration::from_millis(delay_ms + jitter(delay_ms));
                    let delay = e.retry_after().map_or(backoff, |hint| hint.max(backoff));

                    retry_count += 1;
                    crate::log_throttle_retry!(retry_count, delay);
                    sleep_or_cancel(delay, cancel, "bulk_import").await?;

                    delay_ms = delay_ms.saturating_mul(2).min(self.settings.max_backoff_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Up to a quarter of the delay, so throttled writers spread out
fn jitter(delay_ms: u64) -> u64 {
    if delay_ms < 4 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=delay_ms / 4)
}
