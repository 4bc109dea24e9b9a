use tracing::info;

use crate::auth::{Navigator, Session};

/// Signs the session out and sends the user to sign-in.
pub struct SignOutPage;

impl SignOutPage {
    /// Mount effect: `logout()` then navigate.
    pub fn mount(session: &dyn Session, navigator: &dyn Navigator, sign_in_route: &str) {
        info!("signing out");
        session.logout();
        navigator.push(sign_in_route);
    }
}
