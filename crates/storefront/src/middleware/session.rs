//! Session middleware configuration.
//!
//! Sets up cookie sessions using tower-sessions. Production passes a
//! `PostgresStore`; tests pass a `MemoryStore`. The cookie is signed with a
//! key derived from the session secret.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// The cookie is `HttpOnly`, `SameSite=Lax`, and `Secure` when the base URL
/// is https. Sessions expire after 7 days without activity.
#[must_use]
pub fn create_session_layer<S>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S, SignedCookie>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}

/// Cookie signing key: the 64-byte SHA-512 digest of the session secret.
fn signing_key(config: &StorefrontConfig) -> Key {
    let master = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(master.as_slice())
}
