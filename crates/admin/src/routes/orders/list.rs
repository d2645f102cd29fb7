//! Orders list page handler.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::Html,
};
use tracing::instrument;

use author_store_core::{OrderStatus, PaymentStatus};

use crate::{
    db::{OrderRepository, orders::OrderPage},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    state::AppState,
};

use super::super::dashboard::AdminUserView;
use super::super::render_page;
use super::types::{OrdersQuery, payment_class, status_class};

#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub page: OrderPage,
    pub statuses: [OrderStatus; 5],
    pub payment_statuses: [PaymentStatus; 4],
    pub status_value: String,
    pub payment_status_value: String,
    pub search_value: String,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl OrdersIndexTemplate {
    const fn status_class(&self, status: &OrderStatus) -> &'static str {
        status_class(*status)
    }

    const fn payment_class(&self, status: &PaymentStatus) -> &'static str {
        payment_class(*status)
    }
}

/// Orders list page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query.to_filter()?;
    let page = OrderRepository::new(state.pool()).list(&filter).await?;

    let prev_link = (page.page > 1).then(|| query.page_link(page.page - 1));
    let next_link = page.has_next.then(|| query.page_link(page.page + 1));

    Ok(render_page(&OrdersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/orders".to_string(),
        page,
        statuses: OrderStatus::ALL,
        payment_statuses: PaymentStatus::ALL,
        status_value: query.status.unwrap_or_default(),
        payment_status_value: query.payment_status.unwrap_or_default(),
        search_value: query.q.unwrap_or_default(),
        prev_link,
        next_link,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use author_store_core::OrderId;

    use super::*;
    use crate::models::OrderSummary;

    #[test]
    fn list_renders_status_badges() {
        let template = OrdersIndexTemplate {
            admin_user: AdminUserView {
                username: "staff".to_string(),
                email: "staff@example.com".to_string(),
            },
            current_path: "/orders".to_string(),
            page: OrderPage {
                orders: vec![OrderSummary {
                    id: OrderId::new(42),
                    order_number: "ORD-20261015-ABCDEF12".to_string(),
                    customer: "reader".to_string(),
                    email: "reader@example.com".to_string(),
                    total: Decimal::new(3901, 2),
                    status: OrderStatus::Shipped,
                    payment_status: PaymentStatus::Completed,
                    item_count: 2,
                    created_at: Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap(),
                }],
                page: 1,
                has_next: false,
            },
            statuses: OrderStatus::ALL,
            payment_statuses: PaymentStatus::ALL,
            status_value: String::new(),
            payment_status_value: String::new(),
            search_value: String::new(),
            prev_link: None,
            next_link: None,
        };

        let html = template.render().unwrap();
        assert!(html.contains("badge badge-info"));
        assert!(html.contains("badge badge-ok"));
        assert!(html.contains("ORD-20261015-ABCDEF12"));
    }
}
