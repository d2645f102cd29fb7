//! Author Store Core - domain types and business rules.
//!
//! Shared by every Author Store component:
//! - `storefront` - Public JSON API (catalog, carts, checkout, orders, reviews)
//! - `admin` - Staff administration UI and analytics
//! - `cli` - Migrations, inventory checks and catalog seeding
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. Pricing, coupon rules and the order
//! lifecycle live here so that both servers and the CLI agree on them, and so
//! they can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, usernames, ratings and order/payment statuses
//! - [`money`] - Currency rounding and minor-unit conversion
//! - [`coupon`] - Coupon validation and discount calculation
//! - [`pricing`] - Shipping, tax and order total computation
//! - [`order_number`] - Human-readable order numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod coupon;
pub mod money;
pub mod order_number;
pub mod pricing;
pub mod types;

pub use coupon::{CouponError, CouponRules, DiscountType};
pub use order_number::OrderNumber;
pub use pricing::{OrderTotals, PricingPolicy};
pub use types::*;
