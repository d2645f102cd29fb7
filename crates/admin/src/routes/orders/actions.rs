//! Single-order actions.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use author_store_core::{OrderId, OrderStatus};

use crate::{
    db::OrderRepository,
    error::AppError,
    middleware::RequireAdminAuth,
    services::{FulfillmentService, StatusChange},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StatusFormInput {
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingFormInput {
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
}

/// POST /orders/{id}/status
#[instrument(skip(admin, state, input), fields(staff = %admin.username))]
pub async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Form(input): Form<StatusFormInput>,
) -> Result<Redirect, AppError> {
    let status: OrderStatus = input
        .status
        .parse()
        .map_err(|e: author_store_core::UnknownStatus| AppError::BadRequest(e.to_string()))?;

    FulfillmentService::new(state.pool(), state.email())
        .update_status(
            id,
            &StatusChange {
                status,
                tracking_number: input.tracking_number.as_deref(),
                carrier: input.carrier.as_deref(),
                note: input.note.as_deref(),
            },
        )
        .await?;

    Ok(Redirect::to(&format!("/orders/{id}")))
}

/// POST /orders/{id}/tracking
#[instrument(skip(_admin, state, input))]
pub async fn add_tracking(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Form(input): Form<TrackingFormInput>,
) -> Result<Redirect, AppError> {
    let description = input.description.trim();
    if description.is_empty() {
        return Err(AppError::BadRequest("Description is required".to_string()));
    }
    let location = input
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    OrderRepository::new(state.pool())
        .add_note(id, description, location)
        .await?;

    Ok(Redirect::to(&format!("/orders/{id}")))
}
