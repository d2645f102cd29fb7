//! Payment provider endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::{EventOutcome, PaymentService};
use crate::state::AppState;
use crate::stripe::{StripeEvent, verify_signature};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    pub public_key: String,
}

/// `GET /api/stripe/config`
pub async fn config(State(state): State<AppState>) -> Json<PaymentConfig> {
    Json(PaymentConfig {
        public_key: state.stripe().publishable_key().to_string(),
    })
}

/// `POST /api/stripe/webhook`
///
/// The raw body is verified against the signature header before it is parsed.
/// Events that were already applied, or that do not change anything, are
/// still acknowledged so the provider stops retrying them.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_signature(&body, signature, state.stripe().webhook_secret(), now) {
        tracing::warn!(error = %e, "Rejected webhook with bad signature");
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid payload: {e}")))?;

    let outcome = PaymentService::new(state.pool(), state.email())
        .handle_event(&event)
        .await?;

    match outcome {
        EventOutcome::Applied => tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook applied"),
        EventOutcome::Duplicate => tracing::debug!(event_id = %event.id, "Duplicate webhook"),
        EventOutcome::Ignored => tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook ignored"),
    }

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
