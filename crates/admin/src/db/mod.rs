//! Database access for the admin panel.
//!
//! # Schema: `store` (shared with the storefront)
//!
//! The admin reads and writes the same tables as the storefront. The
//! storefront crate owns the migrations:
//! ```bash
//! cargo run -p author-store-cli -- migrate all
//! ```
//!
//! Staff sessions use the shared `tower_sessions` table under a separate
//! cookie name.

pub mod analytics;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod reviews;
pub mod staff;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use analytics::AnalyticsRepository;
pub use catalog::CatalogRepository;
pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use staff::StaffRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed domain validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
