//! Stripe Checkout integration.
//!
//! This module provides:
//! - [`StripeClient`] for creating and retrieving hosted checkout sessions
//! - Form encoding for the checkout session request
//! - Webhook signature verification and typed event payloads
//!
//! # Flow
//!
//! 1. Checkout creates a pending order and a Stripe checkout session
//! 2. The customer pays on the Stripe-hosted page
//! 3. Stripe calls the webhook; the signature is verified before anything is read
//! 4. The order's payment status is updated from the event

mod client;
mod error;
mod types;
mod webhook;

pub use client::StripeClient;
pub use error::{StripeError, WebhookError};
pub use types::{
    ChargeObject, CheckoutLineItem, CheckoutSession, CheckoutSessionObject,
    CheckoutSessionRequest, StripeEvent,
};
pub use webhook::{SIGNATURE_TOLERANCE_SECS, sign_payload, verify_signature};
