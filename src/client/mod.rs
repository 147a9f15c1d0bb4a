//! Client-side companion of the listing endpoint: an explicit state object
//! with transition functions, a fetch seam and one-directional URL sync,
//! in place of hidden reactive bindings.

pub mod controller;
pub mod fetch;
pub mod url_sync;

pub use controller::{FetchFailure, FetchTicket, ListingController, ListingState, ViewMode};
pub use fetch::{FetchError, HttpProductFetcher, ListingQuery, ProductFetcher};
