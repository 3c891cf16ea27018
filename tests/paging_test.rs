//! Integration tests for paged loading

mod common;

use common::{orders, Order, TestStore};
use entity_store::domain::{EntityStoreError, Filter, OrderBy, PagedLoadingParameters};
use std::collections::BTreeSet;
use test_case::test_case;

/// Follows continuation tokens from the first page to the end
async fn walk_pages(
    test_store: &TestStore,
    first: PagedLoadingParameters<Order>,
) -> Vec<entity_store::domain::PagedResults<Order>> {
    let mut pages = Vec::new();
    let mut params = first;
    loop {
        let page = test_store.store.load_paged(&params, None).await.unwrap();
        let next = params.next_page(&page);
        let done = !page.has_more();
        pages.push(page);
        if done {
            return pages;
        }
        params = next;
    }
}

#[test_case(1 ; "single item pages")]
#[test_case(2 ; "even split")]
#[test_case(3 ; "uneven split")]
#[test_case(10 ; "exact fit")]
#[test_case(25 ; "larger than data")]
#[tokio::test]
async fn test_pages_cover_every_item_once(page_size: usize) {
    let items = orders(10);
    let test_store = TestStore::seeded(&items).await;

    let pages = walk_pages(&test_store, PagedLoadingParameters::new(1, page_size)).await;

    let mut seen = Vec::new();
    for page in &pages {
        assert_eq!(page.total_count, 10);
        assert_eq!(page.result_count, page.results.len());
        assert!(page.result_count <= page_size);
        seen.extend(page.results.iter().map(|o| o.entity_id.clone()));
    }

    // Only the last page may be short
    for page in &pages[..pages.len() - 1] {
        assert_eq!(page.result_count, page_size);
    }

    let unique: BTreeSet<_> = seen.iter().cloned().collect();
    assert_eq!(unique.len(), seen.len(), "duplicate items across pages");

    let all: Vec<Order> = test_store.store.load_items(None).await.unwrap();
    let expected: BTreeSet<_> = all.into_iter().map(|o| o.entity_id).collect();
    assert_eq!(unique, expected);
}

#[test_case(1 ; "page size one")]
#[test_case(4 ; "page size four")]
#[test_case(50 ; "page size fifty")]
#[tokio::test]
async fn test_total_count_matches_filter(page_size: usize) {
    let test_store = TestStore::seeded(&orders(9)).await;
    let params = PagedLoadingParameters::<Order>::new(1, page_size)
        .with_filter(Filter::eq("status", "open"));

    let page = test_store.store.load_paged(&params, None).await.unwrap();
    assert_eq!(page.total_count, 5);
    assert!(page.results.iter().all(|o| o.status == "open"));
}

#[tokio::test]
async fn test_page_number_without_token_skips_pages() {
    let test_store = TestStore::seeded(&orders(10)).await;

    let params = PagedLoadingParameters::<Order>::new(2, 3);
    let page = test_store.store.load_paged(&params, None).await.unwrap();

    let ids: Vec<_> = page.results.iter().map(|o| o.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["o-003", "o-004", "o-005"]);
    assert_eq!(page.page, 2);
    assert!(page.has_more());
}

#[tokio::test]
async fn test_token_takes_precedence_over_page() {
    let test_store = TestStore::seeded(&orders(6)).await;

    let first = test_store
        .store
        .load_paged(&PagedLoadingParameters::<Order>::new(1, 2), None)
        .await
        .unwrap();
    let token = first.continuation_token.clone().unwrap();

    // Page 3 would start at o-004; the token resumes at o-002
    let params = PagedLoadingParameters::<Order>::new(3, 2).with_continuation_token(token);
    let resumed = test_store.store.load_paged(&params, None).await.unwrap();
    assert_eq!(resumed.results[0].entity_id, "o-002");
}

#[tokio::test]
async fn test_last_page_has_no_token() {
    let test_store = TestStore::seeded(&orders(5)).await;

    let params = PagedLoadingParameters::<Order>::new(3, 2);
    let page = test_store.store.load_paged(&params, None).await.unwrap();

    assert_eq!(page.result_count, 1);
    assert!(page.continuation_token.is_none());
}

#[tokio::test]
async fn test_page_past_end_is_empty() {
    let test_store = TestStore::seeded(&orders(4)).await;

    let params = PagedLoadingParameters::<Order>::new(5, 2);
    let page = test_store.store.load_paged(&params, None).await.unwrap();

    assert!(page.results.is_empty());
    assert_eq!(page.total_count, 4);
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_ordering_applies_across_pages() {
    let test_store = TestStore::seeded(&orders(7)).await;
    let first = PagedLoadingParameters::<Order>::new(1, 3)
        .with_order_by(OrderBy::descending("total_cents"));

    let totals: Vec<i64> = walk_pages(&test_store, first)
        .await
        .into_iter()
        .flat_map(|page| page.results)
        .map(|o| o.total_cents)
        .collect();

    assert_eq!(totals.len(), 7);
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_empty_type_yields_empty_page() {
    let test_store = TestStore::provisioned().await;

    let page = test_store
        .store
        .load_paged(&PagedLoadingParameters::<Order>::default(), None)
        .await
        .unwrap();

    assert_eq!(page.total_count, 0);
    assert!(page.results.is_empty());
    assert!(page.continuation_token.is_none());
}

#[tokio::test]
async fn test_invalid_parameters_rejected() {
    let test_store = TestStore::new();

    let err = test_store
        .store
        .load_paged(&PagedLoadingParameters::<Order>::new(1, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EntityStoreError::Validation(_)));

    let err = test_store
        .store
        .load_paged(&PagedLoadingParameters::<Order>::new(0, 10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EntityStoreError::Validation(_)));
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let test_store = TestStore::seeded(&orders(3)).await;
    let params = PagedLoadingParameters::<Order>::new(1, 2).with_continuation_token("%%not-a-token%%");

    let err = test_store.store.load_paged(&params, None).await.unwrap_err();
    assert!(!err.is_throttled());
    assert!(!err.is_cancelled());
}
