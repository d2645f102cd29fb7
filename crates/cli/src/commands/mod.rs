//! Subcommand implementations.

pub mod admin;
pub mod inventory;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// A required environment variable is unset.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Database URL from `primary`, falling back to `DATABASE_URL`.
pub fn database_url(primary: &'static str) -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();

    std::env::var(primary)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar(primary))
}
