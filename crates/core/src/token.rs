//! Session token lookup from request cookies and the client cookie store.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Name of the cookie carrying the bearer token.
pub const TOKEN_COOKIE: &str = "token";

/// Minimal view of an incoming server-side request.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    headers: HashMap<String, String>,
}

impl IncomingRequest {
    /// Build a request from header pairs. Header names are case-insensitive.
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
                .collect(),
        }
    }

    /// Convenience constructor for a request carrying only a `cookie` header.
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self::new([("cookie", cookie)])
    }

    /// Look up a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Extract the token from a server-side request, if any.
pub fn token_from_request(request: Option<&IncomingRequest>) -> Option<String> {
    request
        .and_then(|req| req.header("cookie"))
        .and_then(token_from_cookie_header)
}

/// Parse a raw `cookie` header and return the value of the `token` cookie.
/// A cookie with an empty value is treated as absent.
pub fn token_from_cookie_header(header: &str) -> Option<String> {
    let prefix = format!("{TOKEN_COOKIE}=");
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Client-side cookie storage.
pub trait CookieStore: Send + Sync {
    /// Read a cookie by name.
    fn get(&self, name: &str) -> Option<String>;
}

/// In-memory cookie jar used by the terminal client and tests.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: RwLock<HashMap<String, String>>,
}

impl MemoryCookieStore {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a cookie.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.write().insert(name.into(), value.into());
    }

    /// Remove a cookie.
    pub fn remove(&self, name: &str) {
        self.cookies.write().remove(name);
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }
}

/// Extract the token from the client cookie store.
pub fn token_from_store(store: &dyn CookieStore) -> Option<String> {
    store.get(TOKEN_COOKIE).filter(|token| !token.is_empty())
}
