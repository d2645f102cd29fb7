//! Order detail page handler.

use askama::Template;
use axum::{
    extract::{Path, State},
    response::Html,
};
use tracing::instrument;

use author_store_core::{OrderId, OrderStatus, PaymentStatus};

use crate::{
    db::OrderRepository,
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::OrderDetail,
    state::AppState,
};

use super::super::dashboard::AdminUserView;
use super::super::render_page;
use super::types::{payment_class, status_class};

#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub order: OrderDetail,
    pub next_statuses: Vec<OrderStatus>,
}

impl OrderShowTemplate {
    const fn status_class(&self, status: &OrderStatus) -> &'static str {
        status_class(*status)
    }

    const fn payment_class(&self, status: &PaymentStatus) -> &'static str {
        payment_class(*status)
    }
}

/// Order detail page handler.
#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Html<String>, AppError> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(render_page(&OrderShowTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/orders".to_string(),
        next_statuses: order.next_statuses(),
        order,
    }))
}
