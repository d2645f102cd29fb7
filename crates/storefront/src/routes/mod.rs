//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database)
//!
//! # Auth
//! POST /api/auth/register               - Create account and sign in (rate limited)
//! POST /api/auth/login                  - Sign in (rate limited)
//! POST /api/auth/logout                 - Sign out
//! GET  /api/auth/user                   - Current customer
//!
//! # Catalog
//! GET  /api/categories                  - Category listing
//! GET  /api/categories/{slug}           - Category detail
//! GET  /api/products                    - Product listing with filters
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/products/{slug}/reviews     - Approved reviews
//!
//! # Cart (guest or signed in)
//! GET  /api/cart/current                - Current cart (also `/api/cart`)
//! POST /api/cart/add_item               - Add a product
//! POST /api/cart/update_item            - Set a line quantity
//! POST /api/cart/remove_item            - Remove a line
//! POST /api/cart/clear                  - Empty the cart
//! POST /api/cart/apply_coupon           - Attach or detach a coupon
//! POST /api/cart/create_order           - Checkout (requires auth)
//!
//! # Orders (requires auth)
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order detail
//! GET  /api/orders/{id}/tracking        - Shipment tracking
//! GET  /api/orders/by-session/{id}      - Order for a payment session
//!
//! # Reviews (requires auth)
//! POST /api/reviews                     - Submit a review
//! GET  /api/reviews/mine                - Own reviews
//!
//! # Payments
//! GET  /api/stripe/config               - Publishable key
//! POST /api/stripe/webhook              - Signed provider events
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod reviews;
pub mod stripe;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Register and login share one per-IP limiter.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{slug}", get(catalog::get_category))
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::get_product))
        .route("/products/{slug}/reviews", get(catalog::product_reviews))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/current", get(cart::show))
        .route("/add_item", post(cart::add_item))
        .route("/update_item", post(cart::update_item))
        .route("/remove_item", post(cart::remove_item))
        .route("/clear", post(cart::clear))
        .route("/apply_coupon", post(cart::apply_coupon))
        .route("/create_order", post(cart::create_order))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::detail))
        .route("/{id}/tracking", get(orders::tracking))
        .route("/by-session/{session_id}", get(orders::by_session))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/mine", get(reviews::mine))
}

/// Create the payment routes router.
pub fn stripe_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(stripe::config))
        .route("/webhook", post(stripe::webhook))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/reviews", review_routes())
        .nest("/stripe", stripe_routes());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
