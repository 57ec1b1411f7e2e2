//! Session middleware configuration.
//!
//! Sessions are stored server-side (`PostgreSQL` in production) and
//! identified by a signed cookie. Besides the signed-in user, the session
//! holds the guest cart until login merges it into the persisted cart.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;
use crate::models::{AnonymousCart, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "blossom_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over any session store.
///
/// Production passes a `PostgresStore`; tests pass `tower_sessions::MemoryStore`.
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
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}

/// Derive the 64-byte cookie signing key from the configured secret.
fn signing_key(config: &StorefrontConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// The guest cart held in the session (empty if there is none).
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn anonymous_cart(
    session: &Session,
) -> Result<AnonymousCart, tower_sessions::session::Error> {
    Ok(session
        .get::<AnonymousCart>(session_keys::ANONYMOUS_CART)
        .await?
        .unwrap_or_default())
}

/// Store the guest cart in the session. An empty cart removes the key.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_anonymous_cart(
    session: &Session,
    cart: &AnonymousCart,
) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        clear_anonymous_cart(session).await
    } else {
        session.insert(session_keys::ANONYMOUS_CART, cart).await
    }
}

/// Drop the guest cart from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_anonymous_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<AnonymousCart>(session_keys::ANONYMOUS_CART)
        .await?;
    Ok(())
}
