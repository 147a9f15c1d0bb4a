use uuid::Uuid;

use crate::{
    client::fetch::{FetchError, ListingQuery, ProductFetcher},
    models::Product,
    routes::params::ProductSortBy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Everything the listing page remembers between interactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingState {
    pub q: String,
    pub category_id: Option<Uuid>,
    pub sort: ProductSortBy,
    pub view: ViewMode,
    pub page: i64,
    pub per_page: i64,
    pub with_sold_count: bool,
}

impl ListingState {
    pub fn new(per_page: i64) -> Self {
        Self {
            q: String::new(),
            category_id: None,
            sort: ProductSortBy::default(),
            view: ViewMode::default(),
            page: 1,
            per_page,
            with_sold_count: false,
        }
    }
}

/// Why the last fetch produced no products, kept observable for tests even
/// though the page renders every case the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Network,
    Malformed,
    Rejected,
}

/// Handle for one in-flight request. Responses are applied back through the
/// sequence number so a slow, stale response can never overwrite the result
/// of a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: ListingQuery,
}

#[derive(Debug)]
pub struct ListingController {
    pub state: ListingState,
    products: Vec<Product>,
    total: i64,
    total_pages: i64,
    loading: bool,
    failure: Option<FetchFailure>,
    seq: u64,
}

impl ListingController {
    pub fn new(per_page: i64) -> Self {
        Self::from_state(ListingState::new(per_page))
    }

    pub fn from_state(state: ListingState) -> Self {
        Self {
            state,
            products: Vec::new(),
            total: 0,
            total_pages: 0,
            loading: false,
            failure: None,
            seq: 0,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn total_pages(&self) -> i64 {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn failure(&self) -> Option<FetchFailure> {
        self.failure
    }

    /// Zero products on screen after a settled fetch.
    pub fn is_empty(&self) -> bool {
        !self.loading && self.products.is_empty()
    }

    pub fn submit_search(&mut self, q: impl Into<String>) {
        self.state.q = q.into();
        self.state.page = 1;
    }

    pub fn set_category(&mut self, category_id: Option<Uuid>) {
        self.state.category_id = category_id;
        self.state.page = 1;
    }

    pub fn set_sort(&mut self, sort: ProductSortBy) {
        self.state.sort = sort;
        self.state.page = 1;
    }

    /// Moves between pages without touching search or filters.
    pub fn go_to_page(&mut self, page: i64) {
        self.state.page = page.max(1);
    }

    /// Grid/list toggle is pure client state; no refetch follows it.
    pub fn toggle_view(&mut self) {
        self.state.view = match self.state.view {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        };
    }

    /// Empty-state recovery: drop search and category filter, back to page 1.
    pub fn reset_filters(&mut self) {
        self.state.q.clear();
        self.state.category_id = None;
        self.state.page = 1;
    }

    pub fn query(&self) -> ListingQuery {
        ListingQuery {
            page: self.state.page,
            per_page: self.state.per_page,
            q: if self.state.q.is_empty() {
                None
            } else {
                Some(self.state.q.clone())
            },
            category_id: self.state.category_id,
            sort_by: self.state.sort,
            with_sold_count: self.state.with_sold_count,
        }
    }

    /// Marks the page loading and hands out the ticket for the request the
    /// caller is about to issue.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.seq += 1;
        self.loading = true;
        FetchTicket {
            seq: self.seq,
            query: self.query(),
        }
    }

    /// Applies a settled response. A ticket older than the latest
    /// `begin_fetch` is discarded outright; the newest request still owns
    /// `loading`. Returns whether the response was applied.
    pub fn apply_result(
        &mut self,
        seq: u64,
        result: Result<crate::response::ApiResponse<crate::dto::products::ProductList>, FetchError>,
    ) -> bool {
        if seq != self.seq {
            return false;
        }

        match result {
            Ok(resp) if resp.success => {
                self.products = resp.data.map(|list| list.items).unwrap_or_default();
                match resp.pagination {
                    Some(meta) => {
                        self.total = meta.total;
                        self.total_pages = meta.total_pages;
                    }
                    None => {
                        self.total = self.products.len() as i64;
                        self.total_pages = if self.products.is_empty() { 0 } else { 1 };
                    }
                }
                self.failure = None;
            }
            Ok(_) => self.clear_products(FetchFailure::Rejected),
            Err(FetchError::Network(err)) => {
                tracing::warn!(error = %err, "listing fetch failed");
                self.clear_products(FetchFailure::Network);
            }
            Err(FetchError::Malformed(err)) => {
                tracing::warn!(error = %err, "listing response malformed");
                self.clear_products(FetchFailure::Malformed);
            }
        }

        self.loading = false;
        true
    }

    fn clear_products(&mut self, failure: FetchFailure) {
        self.products.clear();
        self.total = 0;
        self.total_pages = 0;
        self.failure = Some(failure);
    }

    /// One full round trip against the endpoint.
    pub async fn refresh<F: ProductFetcher>(&mut self, fetcher: &F) {
        let ticket = self.begin_fetch();
        let result = fetcher.fetch_products(&ticket.query).await;
        self.apply_result(ticket.seq, result);
    }
}
