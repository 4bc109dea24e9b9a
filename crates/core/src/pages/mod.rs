//! Gated listing pages: server bootstrap plus client render state.

/// Listing detail page.
pub mod detail;
/// Listing collection page.
pub mod listings;
/// Sign-out page.
pub mod signout;

use std::{collections::HashMap, sync::Arc};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    api::{ApiClient, ApiRoute, FetchError, FetchOptions},
    auth::AuthState,
    cache::Snapshot,
    models::Envelope,
    token::{self, IncomingRequest},
};

pub use detail::ListingDetailPage;
pub use listings::ListingsPage;
pub use signout::SignOutPage;

/// Framework-provided context for a server render.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Incoming request, absent for client-side navigations.
    pub request: Option<IncomingRequest>,
    /// Resolved path and query parameters.
    pub query: HashMap<String, String>,
}

impl PageContext {
    /// Context for a request without parameters.
    pub fn new(request: Option<IncomingRequest>) -> Self {
        Self {
            request,
            query: HashMap::new(),
        }
    }

    /// Add a path/query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Non-empty parameter value.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Why a bootstrap produced no payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BootstrapError {
    /// No `token` cookie; the normal signed-out path.
    #[error("no session token")]
    MissingToken,
    /// Detail page rendered without its id.
    #[error("missing route parameter `{0}`")]
    MissingRouteParameter(&'static str),
    /// The single server fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result of a server bootstrap. `error` is the only flag pages act on;
/// `reason` is kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialProps<T> {
    /// No payload is available; the client fetches on its own.
    pub error: bool,
    /// Seed for the page's primary resource.
    pub payload: Option<Envelope<T>>,
    /// Cause when `error` is set.
    pub reason: Option<BootstrapError>,
}

impl<T> InitialProps<T> {
    fn ok(payload: Envelope<T>) -> Self {
        Self {
            error: false,
            payload: Some(payload),
            reason: None,
        }
    }

    fn failed(reason: BootstrapError) -> Self {
        Self {
            error: true,
            payload: None,
            reason: Some(reason),
        }
    }

    /// Props for a render that skipped the server bootstrap.
    pub fn skipped() -> Self {
        Self {
            error: true,
            payload: None,
            reason: None,
        }
    }
}

/// Server bootstrap: read the token, make exactly one fetch for the page's
/// primary resource, never propagate a failure.
pub async fn bootstrap<T: DeserializeOwned>(
    api: &ApiClient,
    ctx: &PageContext,
    route: ApiRoute,
    required_param: Option<&'static str>,
) -> InitialProps<T> {
    let Some(token) = token::token_from_request(ctx.request.as_ref()) else {
        debug!(path = route.path(), "no token cookie, skipping server fetch");
        return InitialProps::failed(BootstrapError::MissingToken);
    };

    let mut options = FetchOptions::server(token);
    if let Some(name) = required_param {
        match ctx.param(name) {
            Some(value) => options = options.segment(value),
            None => {
                warn!(param = name, "route parameter missing, skipping server fetch");
                return InitialProps::failed(BootstrapError::MissingRouteParameter(name));
            }
        }
    }

    match api.fetch::<T>(route, &options).await {
        Ok(payload) => InitialProps::ok(payload),
        Err(err) => {
            warn!(path = route.path(), %err, "SSR fetch failed");
            InitialProps::failed(err.into())
        }
    }
}

/// The four mutually exclusive render states of a gated page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageView<T> {
    /// Placeholder while the guard redirects.
    Unauthenticated,
    /// Fetch failed and nothing is cached.
    Failed(&'static str),
    /// Nothing cached yet.
    Loading,
    /// Content.
    Ready(T),
}

impl<T> PageView<T> {
    /// Whether the page shows content.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Shared gate: auth first, then cached data (even when a refresh failed),
/// then the error, then loading.
pub(crate) fn gate<T, R>(
    auth: AuthState,
    snapshot: Snapshot<T>,
    failure: &'static str,
    ready: impl FnOnce(Arc<Envelope<T>>) -> R,
) -> PageView<R> {
    if !auth.is_authenticated() {
        return PageView::Unauthenticated;
    }
    match (snapshot.data, snapshot.error) {
        (Some(data), _) => PageView::Ready(ready(data)),
        (None, Some(_)) => PageView::Failed(failure),
        (None, None) => PageView::Loading,
    }
}
