#![warn(clippy::all, missing_docs)]

//! Core of the authenticated listing pages.
//!
//! Pages are bootstrapped on the server from the `token` cookie, then kept
//! fresh on the client by a stale-while-revalidate cache. Favourite ids are
//! overlaid onto listing collections, and an auth guard redirects to sign-in
//! whenever the session flag drops.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod favourites;
pub mod models;
pub mod pages;
pub mod token;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiRoute, AppRoute, FetchError, FetchOptions, Fetcher, HttpFetcher};
pub use auth::{AuthGuard, AuthState, AuthStore, Navigator, Session};
pub use cache::{EntryState, EnvironmentSignal, Resource, ResourceCache, ResourceOptions};
pub use config::AppConfig;
pub use context::AppContext;
pub use favourites::{FavouriteSet, FavouritesOverlay};
pub use models::{Envelope, ListingDetail, ListingSummary};
pub use pages::{InitialProps, ListingDetailPage, ListingsPage, PageContext, PageView, SignOutPage};
