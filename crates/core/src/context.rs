//! Explicit application context handed to pages.

use std::sync::Arc;

use crate::{
    api::{ApiClient, Fetcher},
    auth::AuthStore,
    cache::{ResourceCache, RevalidatePolicy},
    config::{AppConfig, ConfigError},
    token::{self, CookieStore},
};

/// Everything a page needs from the process: config, transport, cache,
/// auth flag and cookie jar.
#[derive(Clone)]
pub struct AppContext {
    api: ApiClient,
    cache: ResourceCache,
    auth: AuthStore,
    cookies: Arc<dyn CookieStore>,
}

impl AppContext {
    /// Assemble a context. Fails if the configured base URLs are unusable.
    pub fn new(
        config: Arc<AppConfig>,
        fetcher: Arc<dyn Fetcher>,
        auth: AuthStore,
        cookies: Arc<dyn CookieStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiClient::new(config, fetcher)?,
            cache: ResourceCache::new(),
            auth,
            cookies,
        })
    }

    /// API client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Configuration.
    pub fn config(&self) -> &AppConfig {
        self.api.config()
    }

    /// Shared resource cache.
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Authentication store.
    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Token from the client cookie jar.
    pub fn client_token(&self) -> Option<String> {
        token::token_from_store(self.cookies.as_ref())
    }

    /// Revalidation policy from the configuration.
    pub fn revalidate_policy(&self) -> RevalidatePolicy {
        RevalidatePolicy::from(self.config())
    }
}
