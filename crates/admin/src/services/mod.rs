//! Business logic services for admin.
//!
//! # Services
//!
//! - `analytics` - Dashboard aggregation
//! - `auth` - Staff password authentication
//! - `email` - Shipping, delivery and low-stock emails via SMTP
//! - `fulfillment` - Order status changes and their side effects

pub mod analytics;
pub mod auth;
pub mod email;
pub mod fulfillment;

pub use analytics::{AnalyticsService, DashboardData};
pub use auth::{AdminAuthError, AdminAuthService};
pub use email::{EmailError, EmailService};
pub use fulfillment::{BulkAction, BulkOutcome, FulfillmentError, FulfillmentService, StatusChange};
