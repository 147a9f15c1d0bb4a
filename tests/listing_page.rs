use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use url::Url;
use uuid::Uuid;

use storefront_api::{
    client::{
        FetchError, FetchFailure, ListingController, ListingQuery, ProductFetcher, ViewMode,
        url_sync,
    },
    dto::products::ProductList,
    models::Product,
    response::{ApiResponse, PageMeta},
    routes::params::ProductSortBy,
};

fn sample_product(slug: &str) -> Product {
    Product {
        id: Uuid::now_v7(),
        slug: slug.to_string(),
        name: slug.to_string(),
        description: None,
        price: dec!(10.00),
        stock: 5,
        rating: dec!(4.5),
        category_id: Uuid::new_v4(),
        height: None,
        length: None,
        weight: None,
        width: None,
        created_at: Utc::now(),
        sold_count: None,
    }
}

enum Script {
    Success(Vec<&'static str>, i64, i64),
    Rejected,
    Network,
    Malformed,
}

/// Scripted endpoint double; records every query it receives.
struct FakeFetcher {
    script: Mutex<Vec<Script>>,
    seen: Mutex<Vec<ListingQuery>>,
}

impl FakeFetcher {
    fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<ListingQuery> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductFetcher for FakeFetcher {
    async fn fetch_products(
        &self,
        query: &ListingQuery,
    ) -> Result<ApiResponse<ProductList>, FetchError> {
        self.seen.lock().unwrap().push(query.clone());
        let step = self.script.lock().unwrap().remove(0);
        match step {
            Script::Success(slugs, total, per_page) => {
                let items = slugs.into_iter().map(sample_product).collect();
                Ok(ApiResponse::success(
                    "Products",
                    ProductList { items },
                    Some(PageMeta::new(query.page, per_page, total)),
                ))
            }
            Script::Rejected => Ok(ApiResponse::failure("boom")),
            Script::Network => Err(FetchError::Network("connection refused".into())),
            Script::Malformed => Err(FetchError::Malformed("expected value at line 1".into())),
        }
    }
}

#[tokio::test]
async fn search_submit_resets_page_and_sends_q() {
    let fetcher = FakeFetcher::new(vec![Script::Success(vec!["mug"], 1, 20)]);
    let mut page = ListingController::new(20);
    page.go_to_page(4);

    page.submit_search("mug");
    assert_eq!(page.state.page, 1);

    page.refresh(&fetcher).await;
    let seen = fetcher.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].q.as_deref(), Some("mug"));
    assert_eq!(seen[0].page, 1);

    let mut url = Url::parse("https://shop.example/products").unwrap();
    url_sync::write_query(&page.state, &mut url);
    assert!(url.query().unwrap().contains("q=mug"));

    // An empty search drops the parameter again.
    page.submit_search("");
    url_sync::write_query(&page.state, &mut url);
    assert!(url.query().is_none());
}

#[tokio::test]
async fn page_change_preserves_search_and_filter() {
    let fetcher = FakeFetcher::new(vec![Script::Success(vec!["a"], 30, 20)]);
    let category = Uuid::new_v4();
    let mut page = ListingController::new(20);
    page.submit_search("lamp");
    page.set_category(Some(category));

    page.go_to_page(2);
    assert_eq!(page.state.q, "lamp");
    assert_eq!(page.state.category_id, Some(category));
    assert_eq!(page.state.page, 2);

    page.refresh(&fetcher).await;
    let seen = fetcher.seen();
    assert_eq!(seen[0].q.as_deref(), Some("lamp"));
    assert_eq!(seen[0].category_id, Some(category));
    assert_eq!(seen[0].page, 2);
}

#[tokio::test]
async fn category_and_sort_changes_reset_page() {
    let mut page = ListingController::new(20);
    page.go_to_page(5);
    page.set_category(Some(Uuid::new_v4()));
    assert_eq!(page.state.page, 1);

    page.go_to_page(5);
    page.set_sort(ProductSortBy::PriceLow);
    assert_eq!(page.state.page, 1);
}

#[tokio::test]
async fn failed_fetches_show_zero_products_and_settle_loading() {
    let cases = [
        (Script::Network, FetchFailure::Network),
        (Script::Malformed, FetchFailure::Malformed),
        (Script::Rejected, FetchFailure::Rejected),
    ];

    for (script, expected) in cases {
        let fetcher = FakeFetcher::new(vec![Script::Success(vec!["a", "b"], 2, 20), script]);
        let mut page = ListingController::new(20);

        page.refresh(&fetcher).await;
        assert_eq!(page.products().len(), 2);

        page.refresh(&fetcher).await;
        assert!(page.products().is_empty());
        assert_eq!(page.total(), 0);
        assert!(!page.is_loading());
        assert_eq!(page.failure(), Some(expected));
        assert!(page.is_empty());
    }
}

#[tokio::test]
async fn success_updates_pagination_counters() {
    let fetcher = FakeFetcher::new(vec![Script::Success(vec!["a", "b"], 5, 2)]);
    let mut page = ListingController::new(2);

    page.refresh(&fetcher).await;
    assert_eq!(page.total(), 5);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.failure(), None);
}

#[tokio::test]
async fn empty_state_reset_returns_to_unfiltered_first_page() {
    let fetcher = FakeFetcher::new(vec![
        Script::Success(vec![], 0, 20),
        Script::Success(vec!["a"], 1, 20),
    ]);
    let mut page = ListingController::new(20);
    page.submit_search("no such product");
    page.set_category(Some(Uuid::new_v4()));

    page.refresh(&fetcher).await;
    assert!(page.is_empty());

    page.reset_filters();
    page.refresh(&fetcher).await;

    let seen = fetcher.seen();
    let reset_query = &seen[1];
    assert_eq!(reset_query.q, None);
    assert_eq!(reset_query.category_id, None);
    assert_eq!(reset_query.page, 1);
    assert_eq!(page.products().len(), 1);
}

#[test]
fn view_toggle_is_pure_client_state() {
    let mut page = ListingController::new(20);
    assert_eq!(page.state.view, ViewMode::Grid);
    page.toggle_view();
    assert_eq!(page.state.view, ViewMode::List);
    page.toggle_view();
    assert_eq!(page.state.view, ViewMode::Grid);
}

#[test]
fn stale_response_cannot_overwrite_newer_one() {
    let mut page = ListingController::new(20);

    let stale = page.begin_fetch();
    let fresh = page.begin_fetch();
    assert!(page.is_loading());

    let stale_resp = ApiResponse::success(
        "Products",
        ProductList {
            items: vec![sample_product("old")],
        },
        Some(PageMeta::new(1, 20, 1)),
    );
    // The stale response arrives late and must be discarded; the newer
    // request still owns the loading flag.
    assert!(!page.apply_result(stale.seq, Ok(stale_resp)));
    assert!(page.products().is_empty());
    assert!(page.is_loading());

    let fresh_resp = ApiResponse::success(
        "Products",
        ProductList {
            items: vec![sample_product("new")],
        },
        Some(PageMeta::new(1, 20, 1)),
    );
    assert!(page.apply_result(fresh.seq, Ok(fresh_resp)));
    assert_eq!(page.products()[0].slug, "new");
    assert!(!page.is_loading());
}

#[test]
fn url_round_trip_reproduces_state() {
    let category = Uuid::new_v4();
    let mut state = storefront_api::client::ListingState::new(20);
    state.q = "ceramic mug".to_string();
    state.category_id = Some(category);
    state.sort = ProductSortBy::PriceHigh;
    state.page = 3;

    let mut url = Url::parse("https://shop.example/products?ref=newsletter").unwrap();
    url_sync::write_query(&state, &mut url);

    // Unrelated parameters survive the sync.
    assert!(url.query().unwrap().contains("ref=newsletter"));

    let restored = url_sync::read_query(&url, 20);
    assert_eq!(restored.q, state.q);
    assert_eq!(restored.category_id, state.category_id);
    assert_eq!(restored.sort, state.sort);
    assert_eq!(restored.page, state.page);
}

#[test]
fn default_state_writes_a_clean_url() {
    let state = storefront_api::client::ListingState::new(20);
    let mut url = Url::parse("https://shop.example/products?q=stale&page=9").unwrap();
    url_sync::write_query(&state, &mut url);
    assert_eq!(url.query(), None);

    let restored = url_sync::read_query(&url, 20);
    assert_eq!(restored, state);
}
