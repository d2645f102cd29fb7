//! Rate limiting for credential endpoints using governor and `tower_governor`.
//!
//! Clients are keyed by IP. Behind a proxy the address is taken from
//! `X-Forwarded-For`, `X-Real-IP` or `Forwarded`, falling back to the peer
//! address, which requires serving with `into_make_service_with_connect_info`.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for register and login: one request every 6 seconds per IP,
/// with a burst of 5.
///
/// # Panics
///
/// Does not panic: both settings are non-zero constants, which the builder
/// always accepts.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("per_second(6) and burst_size(5) are non-zero");
    GovernorLayer::new(Arc::new(config))
}
