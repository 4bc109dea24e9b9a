use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{error::FetchError, routes::ApiRoute};
use crate::{
    config::{AppConfig, ConfigError},
    models::Envelope,
};

/// A fully resolved GET request. Doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRequest {
    /// Absolute URL.
    pub url: String,
    /// Request headers, kept sorted so equal header sets compare equal.
    pub headers: BTreeMap<String, String>,
}

impl ResourceRequest {
    /// Request with no headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a header. Names are lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Stable fingerprint of the header set.
    pub fn headers_fingerprint(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bearer token carried by the request, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GET {}", self.url)
    }
}

/// Transport seam: performs one GET and returns the decoded JSON body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue the request. Non-2xx responses and non-JSON bodies are errors.
    async fn get(&self, request: &ResourceRequest) -> Result<Value, FetchError>;
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher sharing an existing client (connection pool, timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, request: &ResourceRequest) -> Result<Value, FetchError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|err| {
            warn!(url = %request.url, %err, "request failed");
            FetchError::Network {
                message: err.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %request.url, status = status.as_u16(), "non-success status");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Per-call options for [`ApiClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Use the server base URL instead of the client one.
    pub is_server: bool,
    /// Bearer token; `None` omits the `Authorization` header.
    pub token: Option<String>,
    /// Extra path segments, e.g. a listing id.
    pub route_segments: Vec<String>,
}

impl FetchOptions {
    /// Options for a server-side fetch.
    pub fn server(token: impl Into<String>) -> Self {
        Self {
            is_server: true,
            token: Some(token.into()),
            route_segments: Vec::new(),
        }
    }

    /// Options for a client-side fetch.
    pub fn client(token: Option<String>) -> Self {
        Self {
            is_server: false,
            token,
            route_segments: Vec::new(),
        }
    }

    /// Append a path segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.route_segments.push(segment.into());
        self
    }
}

/// Resolves endpoints against the configured base URLs and decodes envelopes.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<AppConfig>,
    server_base: Url,
    client_base: Url,
    fetcher: Arc<dyn Fetcher>,
}

impl ApiClient {
    /// Client over the given transport. Fails if either base URL is not an
    /// absolute URL that can carry a path.
    pub fn new(config: Arc<AppConfig>, fetcher: Arc<dyn Fetcher>) -> Result<Self, ConfigError> {
        let server_base = config.parsed_base_url(true)?;
        let client_base = config.parsed_base_url(false)?;
        Ok(Self {
            config,
            server_base,
            client_base,
            fetcher,
        })
    }

    /// Client over `reqwest`.
    pub fn http(config: Arc<AppConfig>) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(HttpFetcher::new()))
    }

    /// Active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Underlying transport.
    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Build the request for an endpoint without sending it. Route segments
    /// are percent-encoded, so an id cannot escape its path segment.
    pub fn request(&self, route: ApiRoute, options: &FetchOptions) -> ResourceRequest {
        let mut url = if options.is_server {
            self.server_base.clone()
        } else {
            self.client_base.clone()
        };
        // Bases are checked in `new`, so this only fails for opaque URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(route.path().split('/').filter(|part| !part.is_empty()))
                .extend(&options.route_segments);
        }

        let request = ResourceRequest::new(String::from(url));
        match options.token.as_deref() {
            Some(token) => request.with_header(AUTHORIZATION.as_str(), format!("Bearer {token}")),
            None => request,
        }
    }

    /// Fetch and decode one envelope.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        route: ApiRoute,
        options: &FetchOptions,
    ) -> Result<Envelope<T>, FetchError> {
        let request = self.request(route, options);
        fetch_envelope(self.fetcher.as_ref(), &request).await
    }
}

/// Run a request through a fetcher and decode the `{data: T}` envelope.
pub async fn fetch_envelope<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    request: &ResourceRequest,
) -> Result<Envelope<T>, FetchError> {
    let body = fetcher.get(request).await?;
    Ok(serde_json::from_value(body)?)
}
