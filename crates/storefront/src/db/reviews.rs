//! Product review queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use author_store_core::{ProductId, Rating, ReviewId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Review;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    product_name: String,
    user_id: UserId,
    username: String,
    rating: i16,
    title: String,
    comment: String,
    is_verified_purchase: bool,
    is_approved: bool,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product: row.product_id,
            product_name: row.product_name,
            user_id: row.user_id,
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

const REVIEW_SELECT: &str = r"
    SELECT pr.id, pr.product_id, p.name AS product_name, pr.user_id, u.username,
           pr.rating, pr.title, pr.comment, pr.is_verified_purchase, pr.is_approved,
           pr.created_at
    FROM store.product_review pr
    JOIN store.product p ON p.id = pr.product_id
    JOIN store.user u ON u.id = pr.user_id";

#[derive(Debug)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub title: &'a str,
    pub comment: &'a str,
    pub is_verified_purchase: bool,
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Approved reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_approved(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE pr.product_id = $1 AND pr.is_approved ORDER BY pr.created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Everything a customer has written, including reviews awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE pr.user_id = $1 ORDER BY pr.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Whether the customer has a paid order containing the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_purchased(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let purchased = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM store.order o \
                 JOIN store.order_item oi ON oi.order_id = o.id \
                 WHERE o.user_id = $1 AND oi.product_id = $2 \
                   AND o.payment_status IN ('completed', 'refunded') \
             )",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(purchased)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer already reviewed
    /// this product.
    pub async fn create(&self, new: &NewReview<'_>) -> Result<Review, RepositoryError> {
        let id = sqlx::query_scalar::<_, ReviewId>(
            "INSERT INTO store.product_review \
                 (product_id, user_id, rating, title, comment, is_verified_purchase) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(new.product_id)
        .bind(new.user_id)
        .bind(i16::from(new.rating))
        .bind(new.title)
        .bind(new.comment)
        .bind(new.is_verified_purchase)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already reviewed this product"))?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE pr.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(Review::from(row))
    }
}
