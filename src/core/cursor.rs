//! Continuation cursor over a partition-scoped query
//!
//! A [`QueryCursor`] fetches one window per round trip and carries the
//! continuation token between calls. It can be drained to exhaustion, asked
//! for its first item, or stopped after one bounded page whose token goes
//! back to the caller.

use crate::adapters::document::PageRequest;
use crate::core::cancel::CancellationSignal;
use crate::core::provider::ConnectionProvider;
use crate::domain::query::DocumentQuery;
use crate::domain::Result;
use serde_json::Value;

pub struct QueryCursor<'a> {
    provider: &'a ConnectionProvider,
    query: DocumentQuery,
    page_size: usize,
    continuation: Option<String>,
    exhausted: bool,
    cancel: Option<&'a CancellationSignal>,
    request_charge: f64,
}

impl<'a> QueryCursor<'a> {
    pub fn new(
        provider: &'a ConnectionProvider,
        query: DocumentQuery,
        page_size: usize,
        cancel: Option<&'a CancellationSignal>,
    ) -> Self {
        Self {
            provider,
            query,
            page_size: page_size.max(1),
            continuation: None,
            exhausted: false,
            cancel,
            request_charge: 0.0,
        }
    }

    /// Resume from a token returned by an earlier page
    pub fn resume_from(mut self, token: Option<&str>) -> Self {
        self.continuation = token
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);
        self
    }

    /// Request units charged so far
    pub fn request_charge(&self) -> f64 {
        self.request_charge
    }

    /// Next window of documents; `None` once the scan is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.exhausted {
            return Ok(None);
        }

        let request = PageRequest::resume(self.continuation.clone(), self.page_size);
        let query = &self.query;
        let request = &request;
        let page = self
            .provider
            .execute_with_retry("query_documents", self.cancel, |client| async move {
                client.query_documents(query, request).await
            })
            .await?;

        self.request_charge += page.request_charge;
        self.continuation = page.continuation_token;
        self.exhausted = self.continuation.is_none();

        tracing::trace!(
            partition_key = %self.query.partition_key(),
            documents = page.documents.len(),
            has_more = !self.exhausted,
            "Fetched query page"
        );

        Ok(Some(page.documents))
    }

    /// Skips `pages` windows, stopping early at the end of the scan
    pub async fn skip_pages(&mut self, pages: usize) -> Result<()> {
        for _ in 0..pages {
            if self.next_page().await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Follows the cursor to exhaustion
    ///
    /// A failing window fails the whole call.
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut documents = Vec::new();
        while let Some(page) = self.next_page().await? {
            documents.extend(page);
        }
        crate::log_request_charge!("collect_all", self.request_charge);
        Ok(documents)
    }

    /// First document of the scan, if any
    pub async fn take_one(mut self) -> Result<Option<Value>> {
        while let Some(page) = self.next_page().await? {
            if let Some(first) = page.into_iter().next() {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }

    /// One bounded page plus the token to continue from
    pub async fn into_page(mut self) -> Result<(Vec<Value>, Option<String>)> {
        let documents = self.next_page().await?.unwrap_or_default();
        Ok((documents, self.continuation))
    }
}
