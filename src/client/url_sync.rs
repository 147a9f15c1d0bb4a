use url::Url;
use uuid::Uuid;

use crate::{
    client::controller::ListingState,
    routes::params::ProductSortBy,
};

const STATE_KEYS: [&str; 4] = ["q", "categoryId", "sortBy", "page"];

/// State changed -> serialize into the address bar. Query parameters that do
/// not belong to the listing state pass through untouched; defaults are
/// omitted so an unfiltered first page yields a clean URL.
pub fn write_query(state: &ListingState, url: &mut Url) {
    let unrelated: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !STATE_KEYS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &unrelated {
            pairs.append_pair(k, v);
        }
        if !state.q.is_empty() {
            pairs.append_pair("q", &state.q);
        }
        if let Some(category_id) = state.category_id {
            pairs.append_pair("categoryId", &category_id.to_string());
        }
        if state.sort != ProductSortBy::default() {
            pairs.append_pair("sortBy", state.sort.as_str());
        }
        if state.page > 1 {
            pairs.append_pair("page", &state.page.to_string());
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }
}

/// URL present at load -> deserialize into state (a shared or bookmarked
/// link). Unknown values degrade to the defaults instead of failing.
pub fn read_query(url: &Url, per_page: i64) -> ListingState {
    let mut state = ListingState::new(per_page);
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "q" => state.q = v.into_owned(),
            "categoryId" => state.category_id = Uuid::parse_str(&v).ok(),
            "sortBy" => state.sort = ProductSortBy::parse(&v),
            "page" => state.page = v.parse::<i64>().map(|p| p.max(1)).unwrap_or(1),
            _ => {}
        }
    }
    state
}
