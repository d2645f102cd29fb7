//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! store-cli migrate storefront   # store schema (crates/storefront/migrations)
//! store-cli migrate sessions     # tower_sessions tables
//! store-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

async fn connect() -> Result<PgPool, MigrationError> {
    let url = database_url("STOREFRONT_DATABASE_URL")?;
    tracing::info!("Connecting to store database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}

/// Run the `store` schema migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the connection or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Create the session tables shared by the storefront and admin.
///
/// # Errors
///
/// Returns `MigrationError` if the connection or table creation fails.
pub async fn sessions() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Creating session tables...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session tables ready!");
    Ok(())
}
