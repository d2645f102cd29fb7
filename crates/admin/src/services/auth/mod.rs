//! Staff authentication.
//!
//! Staff are ordinary `store.user` rows with `is_staff` set. They sign in
//! with a username and an Argon2 password into the admin session, which is
//! separate from any storefront session.

mod error;

pub use error::AdminAuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use author_store_core::{Email, Username};

use crate::db::StaffRepository;
use crate::models::StaffUser;

/// Minimum password length for staff accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct AdminAuthService<'a> {
    staff: StaffRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            staff: StaffRepository::new(pool),
        }
    }

    /// Check staff credentials and record the login.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` for any unknown account or
    /// password mismatch, so the response never reveals which one failed.
    pub async fn login(&self, username: &str, password: &str) -> Result<StaffUser, AdminAuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AdminAuthError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(AdminAuthError::MissingField("password"));
        }

        let (user, password_hash) = self
            .staff
            .get_credentials(username)
            .await?
            .ok_or(AdminAuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        self.staff.record_login(user.id).await?;

        tracing::info!(staff_id = %user.id, username = %user.username, "Staff login");
        Ok(user)
    }

    /// Create a staff account, or promote an existing user with this username.
    /// Returns the account and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or
    /// `AdminAuthError::Repository` if the write fails.
    pub async fn create_staff(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(StaffUser, bool), AdminAuthError> {
        let username = Username::parse(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        Ok(self
            .staff
            .create_or_promote(username.as_str(), &email, &password_hash)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `AdminAuthError::Repository` if the query fails.
    pub async fn list_staff(&self) -> Result<Vec<StaffUser>, AdminAuthError> {
        Ok(self.staff.list().await?)
    }
}

/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

/// # Errors
///
/// Returns `AdminAuthError::InvalidCredentials` on mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AdminAuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_passwords_round_trip_through_argon2() {
        let hash = hash_password("staff-secret-1").unwrap();
        assert!(verify_password("staff-secret-1", &hash).is_ok());
        assert!(matches!(
            verify_password("staff-secret-2", &hash),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn short_staff_password_is_rejected() {
        assert!(matches!(
            validate_password("1234567"),
            Err(AdminAuthError::WeakPassword(_))
        ));
    }
}
