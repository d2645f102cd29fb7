//! Reviews as the moderation queue shows them.

use chrono::{DateTime, Utc};

use author_store_core::ReviewId;

#[derive(Debug, Clone)]
pub struct ReviewEntry {
    pub id: ReviewId,
    pub product_name: String,
    pub username: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}
