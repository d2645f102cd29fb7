//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//!
//! # Auth
//! GET  /auth/login                 - Login form
//! POST /auth/login                 - Username/password login
//! POST /auth/logout                - Logout
//!
//! # Dashboard
//! GET  /                           - Dashboard overview
//! GET  /api/analytics/dashboard    - Dashboard figures as JSON
//!
//! # Orders
//! GET  /orders                     - Order list (?status=&payment_status=&q=&page=)
//! POST /orders/bulk                - Bulk status action
//! GET  /orders/{id}                - Order detail
//! POST /orders/{id}/status         - Change status
//! POST /orders/{id}/tracking       - Add a tracking note
//!
//! # Catalog
//! GET  /products                   - Product list with inline edit
//! POST /products                   - Create product
//! GET  /products/new               - New product form
//! GET  /products/{id}/edit         - Edit product form
//! POST /products/{id}              - Update product
//! POST /products/{id}/quick        - Inline price/stock/availability update
//! GET  /categories                 - Category list
//! POST /categories                 - Create category
//!
//! # Promotions and moderation
//! GET  /coupons                    - Coupon list
//! POST /coupons                    - Create coupon
//! POST /coupons/{id}/toggle        - Activate/deactivate coupon
//! GET  /reviews                    - Moderation queue (?status=pending|approved)
//! POST /reviews/{id}/approve       - Approve review
//! POST /reviews/{id}/delete        - Delete review
//!
//! # Inventory
//! GET  /inventory                  - Low-stock and out-of-stock products
//! ```

pub mod auth;
pub mod catalog;
pub mod coupons;
pub mod dashboard;
pub mod inventory;
pub mod orders;
pub mod reviews;

use askama::Template;
use axum::{
    Router,
    response::Html,
    routing::{get, post},
};

use crate::state::AppState;

/// Render a page template, logging failures.
fn render_page(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .route("/", get(dashboard::dashboard))
        .route("/api/analytics/dashboard", get(dashboard::dashboard_json))
        .route("/orders", get(orders::index))
        .route("/orders/bulk", post(orders::bulk_update))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/tracking", post(orders::add_tracking))
        .route("/products", get(catalog::products_index).post(catalog::create_product))
        .route("/products/new", get(catalog::new_product))
        .route("/products/{id}/edit", get(catalog::edit_product))
        .route("/products/{id}", post(catalog::update_product))
        .route("/products/{id}/quick", post(catalog::quick_update))
        .route("/categories", get(catalog::categories_index).post(catalog::create_category))
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/{id}/toggle", post(coupons::toggle))
        .route("/reviews", get(reviews::index))
        .route("/reviews/{id}/approve", post(reviews::approve))
        .route("/reviews/{id}/delete", post(reviews::delete))
        .route("/inventory", get(inventory::index))
}

async fn health() -> &'static str {
    "ok"
}
