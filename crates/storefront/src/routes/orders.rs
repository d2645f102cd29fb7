//! Order history and tracking for the signed-in customer.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use author_store_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, TrackingEvent};
use crate::state::AppState;

/// Shipment progress for one order.
#[derive(Debug, Serialize)]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub events: Vec<TrackingEvent>,
}

impl TrackingView {
    fn new(order: Order, events: Vec<TrackingEvent>) -> Self {
        Self {
            order_number: order.order_number,
            status: order.status,
            tracking_number: order.tracking_number,
            carrier: order.carrier,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            events,
        }
    }
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

/// `GET /api/orders`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_for_user(user.id).await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
///
/// Orders belonging to someone else are reported as missing.
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .map(Json)
        .ok_or_else(order_not_found)
}

/// `GET /api/orders/by-session/{session_id}`
///
/// Used by the payment success page to show the order just paid for.
pub async fn by_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_by_session_for_user(&session_id, user.id)
        .await?
        .map(Json)
        .ok_or_else(order_not_found)
}

/// `GET /api/orders/{id}/tracking`
pub async fn tracking(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<TrackingView>> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_for_user(id, user.id)
        .await?
        .ok_or_else(order_not_found)?;
    let events = orders.tracking_events(order.id).await?;
    Ok(Json(TrackingView::new(order, events)))
}
