use async_trait::async_trait;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::{dto::products::ProductList, response::ApiResponse, routes::params::ProductSortBy};

/// Request the controller sends to the listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub page: i64,
    pub per_page: i64,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub sort_by: ProductSortBy,
    pub with_sold_count: bool,
}

impl ListingQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ];
        if let Some(q) = self.q.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("q", q.clone()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("categoryId", category_id.to_string()));
        }
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        if self.with_sold_count {
            pairs.push(("withSoldCount", "true".to_string()));
        }
        pairs
    }
}

/// Transport failures stay distinguishable from malformed payloads even
/// though the page renders both as an empty listing.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

#[async_trait]
pub trait ProductFetcher {
    async fn fetch_products(
        &self,
        query: &ListingQuery,
    ) -> Result<ApiResponse<ProductList>, FetchError>;
}

/// Fetcher backed by the real listing endpoint.
pub struct HttpProductFetcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpProductFetcher {
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let endpoint = base_url.join("/api/products")?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl ProductFetcher for HttpProductFetcher {
    async fn fetch_products(
        &self,
        query: &ListingQuery,
    ) -> Result<ApiResponse<ProductList>, FetchError> {
        let body = self
            .client
            .get(self.endpoint.clone())
            .query(&query.to_query_pairs())
            .send()
            .await?
            .text()
            .await?;

        let resp = serde_json::from_str(&body)?;
        Ok(resp)
    }
}
