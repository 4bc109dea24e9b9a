use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::watch;
use tracing::info;

/// Authentication as seen by gated pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing has been established yet; gated as unauthenticated.
    Unknown,
    /// Signed in.
    Authenticated,
    /// Signed out or no valid token.
    Unauthenticated,
}

impl AuthState {
    /// Only `Authenticated` lets a page render.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Read/mutate interface pages get instead of a global.
pub trait Session: Send + Sync {
    /// Current flag.
    fn is_authenticated(&self) -> bool;
    /// Mark the session signed in.
    fn login(&self);
    /// Mark the session signed out.
    fn logout(&self);
}

static GLOBAL: Lazy<AuthStore> = Lazy::new(AuthStore::new);

/// Process-wide authentication store backed by a watch channel.
#[derive(Debug, Clone)]
pub struct AuthStore {
    state: Arc<watch::Sender<AuthState>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    /// Fresh store in [`AuthState::Unknown`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            state: Arc::new(state),
        }
    }

    /// The single store shared by the whole process.
    pub fn global() -> &'static AuthStore {
        &GLOBAL
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Settle the flag from token presence: no token means signed out.
    pub fn sync_with_token(&self, token: Option<&str>) {
        match token {
            Some(token) if !token.is_empty() => self.set(AuthState::Authenticated),
            _ => self.set(AuthState::Unauthenticated),
        }
    }

    fn set(&self, next: AuthState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(?previous, ?next, "auth state changed");
        }
    }
}

impl Session for AuthStore {
    fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    fn login(&self) {
        self.set(AuthState::Authenticated);
    }

    fn logout(&self) {
        self.set(AuthState::Unauthenticated);
    }
}
