//! Domain models for the admin panel.
//!
//! The admin reads the same `store` schema as the storefront but needs
//! different projections: staff-facing order rows, catalog records with
//! inventory thresholds, and the moderation view of reviews.

pub mod analytics;
pub mod catalog;
pub mod coupon;
pub mod order;
pub mod review;
pub mod session;
pub mod staff;

pub use analytics::{
    CustomerStats, DailySales, RecentOrder, ReviewStats, SalesWindows, StockAlert, TopProduct,
};
pub use catalog::{Category, Product};
pub use coupon::Coupon;
pub use order::{OrderDetail, OrderItem, OrderSummary, TrackingEvent};
pub use review::ReviewEntry;
pub use session::{CurrentAdmin, keys as session_keys};
pub use staff::StaffUser;
