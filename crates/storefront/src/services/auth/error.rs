//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] author_store_core::UsernameError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] author_store_core::EmailError),

    /// Wrong password or unknown username.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("A user with that username already exists.")]
    UserAlreadyExists,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}
