//! Review moderation queue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use author_store_core::ReviewId;

use crate::{
    db::ReviewRepository,
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::ReviewEntry,
    state::AppState,
};

use super::dashboard::AdminUserView;

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub status: Option<String>,
}

impl ReviewsQuery {
    /// Only `approved` shows approved reviews; anything else is the queue.
    fn approved(&self) -> bool {
        self.status.as_deref() == Some("approved")
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub reviews: Vec<ReviewEntry>,
    pub showing_approved: bool,
}

/// GET /reviews
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<ReviewsIndexTemplate, AppError> {
    let showing_approved = query.approved();
    let reviews = ReviewRepository::new(state.pool())
        .list(showing_approved)
        .await?;

    Ok(ReviewsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/reviews".to_string(),
        reviews,
        showing_approved,
    })
}

/// POST /reviews/{id}/approve
#[instrument(skip(_admin, state))]
pub async fn approve(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Redirect, AppError> {
    ReviewRepository::new(state.pool()).approve(id).await?;
    tracing::info!(review_id = %id, "Review approved");
    Ok(Redirect::to("/reviews"))
}

/// POST /reviews/{id}/delete
#[instrument(skip(_admin, state))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Redirect, AppError> {
    ReviewRepository::new(state.pool()).delete(id).await?;
    tracing::info!(review_id = %id, "Review deleted");
    Ok(Redirect::to("/reviews"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_the_default() {
        assert!(!ReviewsQuery { status: None }.approved());
        assert!(!ReviewsQuery { status: Some("pending".into()) }.approved());
        assert!(ReviewsQuery { status: Some("approved".into()) }.approved());
    }
}
