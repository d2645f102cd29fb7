//! Bulk status actions for orders.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    middleware::RequireAdminAuth,
    services::{BulkAction, FulfillmentService, fulfillment::parse_order_ids},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BulkOrdersInput {
    /// One of `mark_processing`, `mark_shipped`, `mark_delivered`, `cancel`.
    pub action: String,
    /// Comma-separated list of order IDs.
    pub order_ids: String,
}

/// POST /orders/bulk
#[instrument(skip(admin, state, input), fields(staff = %admin.username, action = %input.action))]
pub async fn bulk_update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(input): Form<BulkOrdersInput>,
) -> Response {
    let action: BulkAction = match input.action.parse() {
        Ok(action) => action,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    let ids = match parse_order_ids(&input.order_ids) {
        Ok(ids) if !ids.is_empty() => ids,
        Ok(_) => return (StatusCode::BAD_REQUEST, "No orders specified").into_response(),
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    let outcome = FulfillmentService::new(state.pool(), state.email())
        .bulk(action, &ids)
        .await;

    if outcome.errors.is_empty() {
        tracing::info!(count = outcome.updated, "Bulk order update completed");
        Redirect::to("/orders").into_response()
    } else {
        tracing::warn!(
            success = outcome.updated,
            errors = ?outcome.errors,
            "Bulk order update completed with errors"
        );
        (
            StatusCode::MULTI_STATUS,
            format!(
                "Updated {} orders. Errors: {}",
                outcome.updated,
                outcome.errors.join("; ")
            ),
        )
            .into_response()
    }
}
