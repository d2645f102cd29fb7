//! Staff account management commands.
//!
//! # Usage
//!
//! ```bash
//! store-cli admin create -u alice -e alice@example.com -p 'correct horse'
//! store-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use sqlx::PgPool;
use thiserror::Error;

use author_store_admin::db;
use author_store_admin::services::{AdminAuthError, AdminAuthService};

use super::{MissingEnvVar, database_url};

/// Errors that can occur during staff account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

async fn connect() -> Result<PgPool, AdminError> {
    let url = database_url("ADMIN_DATABASE_URL")?;
    tracing::info!("Connecting to store database...");
    Ok(db::create_pool(&url).await?)
}

/// Create a staff account, or grant staff access to an existing user with
/// the same username.
///
/// # Errors
///
/// Returns `AdminError::Auth` for invalid input, or a database error.
pub async fn create_user(username: &str, email: &str, password: &str) -> Result<(), AdminError> {
    let pool = connect().await?;

    let (user, created) = AdminAuthService::new(&pool)
        .create_staff(username, email, password)
        .await?;

    if created {
        tracing::info!(
            "Staff user created! ID: {}, Username: {}, Email: {}",
            user.id,
            user.username,
            user.email
        );
    } else {
        tracing::info!(
            "Existing user {} (ID {}) promoted to staff; password updated",
            user.username,
            user.id
        );
    }
    Ok(())
}

/// Log every staff account.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_users() -> Result<(), AdminError> {
    let pool = connect().await?;
    let staff = AdminAuthService::new(&pool).list_staff().await?;

    tracing::info!("{} staff account(s)", staff.len());
    for user in staff {
        let last_login = user
            .last_login_at
            .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        tracing::info!(
            "  {:>4}  {:<20} {:<32} last login {}",
            user.id,
            user.username,
            user.email,
            last_login
        );
    }
    Ok(())
}
