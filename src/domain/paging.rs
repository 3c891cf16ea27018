//! Paged loading parameters and results

use crate::domain::errors::EntityStoreError;
use crate::domain::query::{Filter, OrderBy};
use crate::domain::result::Result;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Default page size used by [`PagedLoadingParameters::default`]
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Parameters of one paged load for entity type `T`
///
/// A non-empty continuation token takes precedence over `page`: the scan
/// resumes exactly where the previous call stopped.
///
/// # Examples
///
/// ```
/// use entity_store::domain::paging::PagedLoadingParameters;
/// use entity_store::domain::query::{Filter, OrderBy};
/// # #[derive(serde::Serialize, serde::Deserialize)]
/// # struct Order { entity_id: String, entity_type: String }
/// # impl entity_store::domain::Entity for Order {
/// #     const TYPE_TAG: &'static str = "Order";
/// #     fn entity_id(&self) -> &str { &self.entity_id }
/// #     fn entity_type(&self) -> &str { &self.entity_type }
/// # }
///
/// let params = PagedLoadingParameters::<Order>::new(1, 50)
///     .with_filter(Filter::eq("status", "open"))
///     .with_order_by(OrderBy::descending("created"));
/// assert_eq!(params.page_size, 50);
/// ```
pub struct PagedLoadingParameters<T> {
    /// 1-based page number, used only when no continuation token is given
    pub page: usize,
    /// Maximum items per page
    pub page_size: usize,
    /// Opaque token returned by the previous page
    pub continuation_token: Option<String>,
    /// Optional filter applied after the type-key predicate
    pub filter: Option<Filter>,
    /// Optional ordering key
    pub order_by: Option<OrderBy>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PagedLoadingParameters<T> {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            continuation_token: None,
            filter: None,
            order_by: None,
            _entity: PhantomData,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }

    /// Parameters for the page following `previous`
    pub fn next_page<R>(&self, previous: &PagedResults<R>) -> Self {
        Self {
            page: self.page + 1,
            page_size: self.page_size,
            continuation_token: previous.continuation_token.clone(),
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            _entity: PhantomData,
        }
    }

    /// Non-empty continuation token, if any
    pub fn resume_token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(EntityStoreError::Validation(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.page == 0 && self.resume_token().is_none() {
            return Err(EntityStoreError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl<T> Default for PagedLoadingParameters<T> {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl<T> Clone for PagedLoadingParameters<T> {
    fn clone(&self) -> Self {
        Self {
            page: self.page,
            page_size: self.page_size,
            continuation_token: self.continuation_token.clone(),
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PagedLoadingParameters<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedLoadingParameters")
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("continuation_token", &self.continuation_token)
            .field("filter", &self.filter)
            .field("order_by", &self.order_by)
            .finish()
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResults<T> {
    /// Items of this page, in query order
    pub results: Vec<T>,
    /// Number of items matching the filter across all pages
    pub total_count: u64,
    /// Number of items on this page
    pub result_count: usize,
    /// Page number echoed from the request
    pub page: usize,
    /// Page size echoed from the request
    pub page_size: usize,
    /// Token for the next page; `None` once the scan is exhausted
    pub continuation_token: Option<String>,
}

impl<T> PagedResults<T> {
    /// Whether another page can be requested
    pub fn has_more(&self) -> bool {
        self.continuation_token.is_some()
    }
}
