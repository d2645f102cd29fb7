//! Customer registration and password login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use author_store_core::{Email, Username};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields accepted by registration.
#[derive(Debug, Default)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField`, `InvalidUsername`, `InvalidEmail` or
    /// `WeakPassword` for bad input, and `AuthError::UserAlreadyExists` if the
    /// username is taken.
    pub async fn register(&self, registration: &Registration<'_>) -> Result<User, AuthError> {
        let username = Username::parse(required("username", registration.username)?)?;
        let email = Email::parse(required("email", registration.email)?)?;
        validate_password(registration.password)?;

        let password_hash = hash_password(registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                username: username.as_str(),
                email: &email,
                first_name: registration.first_name.trim(),
                last_name: registration.last_name.trim(),
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.users.record_login(user.id).await?;
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for blank input and
    /// `AuthError::InvalidCredentials` if the account is unknown, inactive or
    /// the password does not match.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = required("username", username)?;
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let (user, password_hash) = self
            .users
            .get_credentials(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        self.users.record_login(user.id).await?;

        Ok(user)
    }
}

fn required<'s>(field: &'static str, value: &'s str) -> Result<&'s str, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AuthError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC-format hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch and
/// `AuthError::PasswordHash` if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn garbage_hash_is_a_hash_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::PasswordHash)
        ));
    }

    #[test]
    fn required_trims_and_names_the_field() {
        assert_eq!(required("username", "  ada ").unwrap(), "ada");
        assert!(matches!(
            required("email", "   "),
            Err(AuthError::MissingField("email"))
        ));
    }
}
