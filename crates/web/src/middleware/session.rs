//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session id
//! cookie is signed with a key derived from `DELICIOUS_SESSION_SECRET`.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "dl_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Cookie signing key for `secret`.
///
/// SHA-512 stretches the secret to the 64 bytes `Key` needs.
#[must_use]
pub fn session_key(secret: &SecretString) -> Key {
    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Create the session layer with `PostgreSQL` store.
///
/// The session table is created by `dl-cli migrate`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(session_key(&config.session_secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_follows_secret() {
        let secret = SecretString::from("q8Vz3kLmN0pR7sTuWx2yB5cD9fGhJ4aE");
        let other = SecretString::from("Zr5tY8uI1oP4aS7dF0gH3jK6lQ9wE2xC");

        assert_eq!(session_key(&secret).master(), session_key(&secret).master());
        assert_ne!(session_key(&secret).master(), session_key(&other).master());
        assert_eq!(session_key(&secret).master().len(), 64);
    }
}
