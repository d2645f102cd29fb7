//! Staff account queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use author_store_core::{Email, UserId};

use super::RepositoryError;
use crate::models::StaffUser;

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: UserId,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StaffRow> for StaffUser {
    type Error = RepositoryError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for user {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            username: row.username,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: StaffRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    user: StaffRow,
    inserted: bool,
}

const STAFF_COLUMNS: &str =
    "id, username, email, first_name, last_name, last_login_at, created_at";

pub struct StaffRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StaffRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active staff account and its password hash. Customers are never
    /// returned, so a customer password cannot open the admin panel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(StaffUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {STAFF_COLUMNS}, password_hash FROM store.user \
             WHERE username = $1 AND is_staff AND is_active"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((StaffUser::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE store.user SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// All staff accounts by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<StaffUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, StaffRow>(&format!(
            "SELECT {STAFF_COLUMNS} FROM store.user WHERE is_staff ORDER BY username"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(StaffUser::try_from).collect()
    }

    /// Create a staff account, or promote the existing account with this
    /// username and reset its email and password. Returns whether a new row
    /// was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn create_or_promote(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<(StaffUser, bool), RepositoryError> {
        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            "INSERT INTO store.user (username, email, password_hash, is_staff) \
             VALUES ($1, $2, $3, TRUE) \
             ON CONFLICT (username) DO UPDATE \
             SET email = EXCLUDED.email, password_hash = EXCLUDED.password_hash, \
                 is_staff = TRUE, is_active = TRUE, updated_at = NOW() \
             RETURNING {STAFF_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await?;

        Ok((StaffUser::try_from(row.user)?, row.inserted))
    }
}
