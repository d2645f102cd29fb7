//! Author Store storefront library.
//!
//! The public JSON API: catalog browsing, guest and customer carts, coupon
//! application, checkout through a hosted payment page, signed payment
//! webhooks, order history and product reviews.
//!
//! The binary in `main.rs` only loads configuration, sets up logging and
//! serves [`app`]; everything else lives here so it can be tested.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
pub mod views;

use axum::{Router, middleware::from_fn};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application with its middleware stack.
///
/// Trailing slashes are trimmed before routing, so `/api/cart/` and
/// `/api/cart` reach the same handler.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    let router = middleware::with_security_headers(routes::routes())
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
