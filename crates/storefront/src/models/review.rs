//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use author_store_core::{ProductId, ReviewId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product: ProductId,
    pub product_name: String,
    #[serde(skip)]
    pub user_id: UserId,
    pub username: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}
