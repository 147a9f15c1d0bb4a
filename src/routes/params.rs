use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Column a listing sort resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Price,
    SoldCount,
    Rating,
    Id,
}

impl SortColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Price => "p.price",
            SortColumn::SoldCount => "sold_count",
            SortColumn::Rating => "p.rating",
            SortColumn::Id => "p.id",
        }
    }
}

/// Sort choices accepted on the wire. Parsing is lenient: anything outside
/// the known set degrades to `newest` rather than rejecting the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSortBy {
    PriceLow,
    PriceHigh,
    Popular,
    Rating,
    #[default]
    Newest,
}

impl ProductSortBy {
    pub fn parse(s: &str) -> Self {
        match s {
            "price_low" => ProductSortBy::PriceLow,
            "price_high" => ProductSortBy::PriceHigh,
            "popular" => ProductSortBy::Popular,
            "rating" => ProductSortBy::Rating,
            _ => ProductSortBy::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSortBy::PriceLow => "price_low",
            ProductSortBy::PriceHigh => "price_high",
            ProductSortBy::Popular => "popular",
            ProductSortBy::Rating => "rating",
            ProductSortBy::Newest => "newest",
        }
    }

    /// Fixed lookup from sort choice to (column, direction).
    pub fn resolve(&self) -> (SortColumn, SortOrder) {
        match self {
            ProductSortBy::PriceLow => (SortColumn::Price, SortOrder::Asc),
            ProductSortBy::PriceHigh => (SortColumn::Price, SortOrder::Desc),
            ProductSortBy::Popular => (SortColumn::SoldCount, SortOrder::Desc),
            ProductSortBy::Rating => (SortColumn::Rating, SortOrder::Desc),
            ProductSortBy::Newest => (SortColumn::Id, SortOrder::Desc),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub with_sold_count: Option<bool>,
}

impl ProductListQuery {
    /// An enumerated `sortBy` fully determines column and direction; with no
    /// `sortBy` at all, an explicit `sortOrder` steers the default id sort.
    pub fn resolve_sort(&self) -> (SortColumn, SortOrder) {
        match self.sort_by.as_deref() {
            Some(s) => ProductSortBy::parse(s).resolve(),
            None => (SortColumn::Id, self.sort_order.unwrap_or(SortOrder::Desc)),
        }
    }

    pub fn wants_sold_count(&self) -> bool {
        self.with_sold_count.unwrap_or(false)
            || self.resolve_sort().0 == SortColumn::SoldCount
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}
