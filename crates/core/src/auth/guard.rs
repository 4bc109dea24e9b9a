use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use super::store::{AuthState, AuthStore};

/// Client-side navigation.
pub trait Navigator: Send + Sync {
    /// Navigate to `route` without a full reload.
    fn push(&self, route: &str);
}

/// Navigator that only records pushes.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pushed: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Routes pushed so far.
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, route: &str) {
        self.pushed.lock().push(route.to_string());
    }
}

/// Pure gate: anything but `Authenticated` redirects.
pub fn should_redirect(state: AuthState) -> bool {
    !state.is_authenticated()
}

/// Turns a stream of states into redirect edges: fires on the first
/// observation if gated, then only when the gate flips from open to closed.
#[derive(Debug, Default)]
pub struct RedirectTracker {
    redirecting: Option<bool>,
}

impl RedirectTracker {
    /// Feed the next state; returns `true` when a redirect must be issued.
    pub fn observe(&mut self, state: AuthState) -> bool {
        let redirect = should_redirect(state);
        let fire = redirect && self.redirecting != Some(true);
        self.redirecting = Some(redirect);
        fire
    }
}

/// Subscribes to the auth store and redirects to sign-in on mount and on
/// every transition to signed-out.
pub struct AuthGuard {
    store: AuthStore,
    navigator: Arc<dyn Navigator>,
    sign_in_route: String,
}

impl AuthGuard {
    /// Guard redirecting to `sign_in_route`.
    pub fn new(
        store: AuthStore,
        navigator: Arc<dyn Navigator>,
        sign_in_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            sign_in_route: sign_in_route.into(),
        }
    }

    /// Start watching. Abort the handle when the page unmounts.
    pub fn spawn(self) -> JoinHandle<()> {
        let mut receiver = self.store.subscribe();
        tokio::spawn(async move {
            let mut tracker = RedirectTracker::default();
            let mut state = *receiver.borrow_and_update();
            loop {
                if tracker.observe(state) {
                    info!(route = %self.sign_in_route, "redirecting to sign-in");
                    self.navigator.push(&self.sign_in_route);
                }
                if receiver.changed().await.is_err() {
                    break;
                }
                state = *receiver.borrow_and_update();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::Session;

    #[test]
    fn tracker_fires_once_per_closing_edge() {
        let mut tracker = RedirectTracker::default();
        assert!(tracker.observe(AuthState::Unknown));
        assert!(!tracker.observe(AuthState::Unauthenticated));
        assert!(!tracker.observe(AuthState::Authenticated));
        assert!(tracker.observe(AuthState::Unauthenticated));
    }

    #[test]
    fn authenticated_first_observation_does_not_fire() {
        let mut tracker = RedirectTracker::default();
        assert!(!tracker.observe(AuthState::Authenticated));
    }

    #[tokio::test]
    async fn guard_redirects_on_mount_and_on_logout() {
        let store = AuthStore::new();
        store.login();
        let navigator = Arc::new(RecordingNavigator::default());
        let handle = AuthGuard::new(store.clone(), navigator.clone(), "/signin").spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(navigator.pushed().is_empty());

        store.logout();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(navigator.pushed(), vec!["/signin".to_string()]);
        handle.abort();
    }
}
