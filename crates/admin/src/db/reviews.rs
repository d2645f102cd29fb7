//! Review moderation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use author_store_core::ReviewId;

use super::RepositoryError;
use crate::models::ReviewEntry;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_name: String,
    username: String,
    rating: i16,
    title: String,
    comment: String,
    is_verified_purchase: bool,
    is_approved: bool,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewEntry {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_name: row.product_name,
            username: row.username,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            is_verified_purchase: row.is_verified_purchase,
            is_approved: row.is_approved,
            created_at: row.created_at,
        }
    }
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews in one moderation state. Pending reviews are listed oldest
    /// first so the queue drains in order; approved ones newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, approved: bool) -> Result<Vec<ReviewEntry>, RepositoryError> {
        let order = if approved { "DESC" } else { "ASC" };
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT r.id, p.name AS product_name, u.username, r.rating, r.title, r.comment, \
                    r.is_verified_purchase, r.is_approved, r.created_at \
             FROM store.product_review r \
             JOIN store.product p ON p.id = r.product_id \
             JOIN store.user u ON u.id = r.user_id \
             WHERE r.is_approved = $1 \
             ORDER BY r.created_at {order}"
        ))
        .bind(approved)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ReviewEntry::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn approve(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.product_review SET is_approved = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.product_review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
