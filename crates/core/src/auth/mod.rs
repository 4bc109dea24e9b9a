//! Authentication flag and the redirect guard built on it.

mod guard;
mod store;

pub use guard::{should_redirect, AuthGuard, Navigator, RecordingNavigator, RedirectTracker};
pub use store::{AuthState, AuthStore, Session};
