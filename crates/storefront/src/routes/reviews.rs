//! Customer reviews.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use author_store_core::{ProductId, Rating};

use crate::db::reviews::NewReview;
use crate::db::{CatalogRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Review;
use crate::state::AppState;

pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateReviewRequest {
    #[serde(alias = "product")]
    pub product_id: Option<ProductId>,
    pub rating: Option<i64>,
    pub title: String,
    pub comment: String,
}

/// Validated review input.
#[derive(Debug, PartialEq, Eq)]
struct ReviewInput<'a> {
    product_id: ProductId,
    rating: Rating,
    title: &'a str,
    comment: &'a str,
}

impl CreateReviewRequest {
    fn validate(&self) -> std::result::Result<ReviewInput<'_>, String> {
        let product_id = self.product_id.ok_or("product_id is required")?;
        let rating = self
            .rating
            .ok_or("rating is required")
            .map(Rating::new)?
            .map_err(|_| "Rating must be between 1 and 5")?;

        let title = self.title.trim();
        if title.is_empty() {
            return Err("title is required".to_string());
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(format!(
                "title must be at most {MAX_TITLE_LENGTH} characters"
            ));
        }

        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err("comment is required".to_string());
        }

        Ok(ReviewInput {
            product_id,
            rating,
            title,
            comment,
        })
    }
}

/// `POST /api/reviews`
///
/// New reviews wait for moderation before they are listed.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let input = body.validate().map_err(AppError::BadRequest)?;

    CatalogRepository::new(state.pool())
        .get_product(input.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let reviews = ReviewRepository::new(state.pool());
    let is_verified_purchase = reviews.has_purchased(user.id, input.product_id).await?;

    let review = reviews
        .create(&NewReview {
            product_id: input.product_id,
            user_id: user.id,
            rating: input.rating,
            title: input.title,
            comment: input.comment,
            is_verified_purchase,
        })
        .await?;

    tracing::info!(review_id = %review.id, verified = is_verified_purchase, "Review submitted");
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/reviews/mine`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Review>>> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: Option<i64>, title: &str, comment: &str) -> CreateReviewRequest {
        CreateReviewRequest {
            product_id: Some(ProductId::new(3)),
            rating,
            title: title.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn accepts_a_complete_review() {
        let req = request(Some(5), "  Loved it ", "Read it twice.");
        let input = req.validate().unwrap();
        assert_eq!(input.rating.get(), 5);
        assert_eq!(input.title, "Loved it");
    }

    #[test]
    fn rating_must_be_in_range() {
        assert_eq!(
            request(Some(6), "t", "c").validate().unwrap_err(),
            "Rating must be between 1 and 5"
        );
        assert_eq!(
            request(None, "t", "c").validate().unwrap_err(),
            "rating is required"
        );
    }

    #[test]
    fn title_length_is_bounded() {
        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(request(Some(4), &long, "c").validate().is_err());
        let exact = "x".repeat(MAX_TITLE_LENGTH);
        assert!(request(Some(4), &exact, "c").validate().is_ok());
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            request(Some(3), "   ", "c").validate().unwrap_err(),
            "title is required"
        );
        assert_eq!(
            request(Some(3), "t", "").validate().unwrap_err(),
            "comment is required"
        );
        let missing_product = CreateReviewRequest {
            product_id: None,
            ..request(Some(3), "t", "c")
        };
        assert_eq!(missing_product.validate().unwrap_err(), "product_id is required");
    }
}
