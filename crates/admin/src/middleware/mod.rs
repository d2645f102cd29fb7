//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers
//! 2. `TraceLayer` (`http_request` span)
//! 3. Security headers
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Route handlers require a signed-in staff member through the
//! [`RequireAdminAuth`] extractor.

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
pub use security_headers::with_security_headers;
pub use session::create_session_layer;
