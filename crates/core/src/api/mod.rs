//! Authenticated access to the property API.

/// Resource fetcher and request construction.
pub mod client;
/// Fetch error taxonomy.
pub mod error;
/// Static endpoint and application routing tables.
pub mod routes;

pub use client::{ApiClient, FetchOptions, Fetcher, HttpFetcher, ResourceRequest};
pub use error::FetchError;
pub use routes::{ApiRoute, AppRoute, EndpointProps};
