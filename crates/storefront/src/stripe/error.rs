//! Stripe-related errors.

use thiserror::Error;

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed before a response arrived.
    #[error("Stripe request failed: {0}")]
    Request(String),

    /// Response body could not be decoded.
    #[error("Stripe response error: {0}")]
    Response(String),

    /// Stripe rejected the request.
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An amount could not be expressed in minor units.
    #[error("Invalid amount: {0}")]
    Amount(#[from] author_store_core::money::MoneyError),
}

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("no matching signature")]
    SignatureMismatch,
}
