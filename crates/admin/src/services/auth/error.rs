//! Staff authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during staff login and account setup.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] author_store_core::UsernameError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] author_store_core::EmailError),

    /// Unknown username, not staff, inactive, or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("password hashing error")]
    PasswordHash,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
