//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the `FromRow` structs in
//! [`crate::db`] and from the JSON views in [`crate::views`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine, CartOwner, Coupon};
pub use catalog::{Category, Product};
pub use order::{Order, OrderItem, ShippingDetails, TrackingEvent};
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
