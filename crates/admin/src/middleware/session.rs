//! Session middleware configuration for admin.
//!
//! Staff sessions share the `tower_sessions` table with the storefront but
//! use their own cookie, a stricter `SameSite` policy and a 24 hour expiry.

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "store_admin_session";

const SESSION_EXPIRY_HOURS: i64 = 24;

#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_EXPIRY_HOURS)))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
