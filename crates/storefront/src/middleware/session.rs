//! Session middleware configuration.
//!
//! Sessions use the in-memory store: the only session state is the cart
//! ledger, the synced profile, and the currency selection - all of which
//! are rebuilt from the external systems of record on a fresh session.
//! Losing sessions on restart is accepted, not an incident.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ps_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(base_url: &str) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();
    let is_secure = base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
