//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `cart` - Cart mutations and pricing
//! - `checkout` - Turning a cart into a pending order and payment session
//! - `payments` - Applying payment provider webhook events
//! - `email` - Order confirmation email

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod payments;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use payments::{EventOutcome, PaymentError, PaymentService};
