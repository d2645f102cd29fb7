//! Request and response shapes for the subset of the Stripe API used here.
//!
//! See: <https://docs.stripe.com/api/checkout/sessions>

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use author_store_core::money::to_minor_units;

use super::error::StripeError;

/// One priced line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: Decimal,
    pub quantity: i32,
}

/// Everything needed to open a checkout session for a pending order.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_id: String,
    pub order_number: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub line_items: Vec<CheckoutLineItem>,
}

impl CheckoutSessionRequest {
    /// Flatten into Stripe's bracketed form encoding.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Amount` if a unit price cannot be expressed in
    /// minor units.
    pub fn form_params(&self, currency: &str) -> Result<Vec<(String, String)>, StripeError> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("client_reference_id".to_string(), self.order_id.clone()),
            ("metadata[order_id]".to_string(), self.order_id.clone()),
            ("metadata[order_number]".to_string(), self.order_number.clone()),
            (
                "payment_intent_data[metadata][order_id]".to_string(),
                self.order_id.clone(),
            ),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            params.push((
                format!("{prefix}[price_data][currency]"),
                currency.to_lowercase(),
            ));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                to_minor_units(item.unit_amount)?.to_string(),
            ));
            params.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        Ok(params)
    }
}

/// A created or retrieved checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A webhook event. `data.object` is decoded lazily by event type.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Decode the event object as `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the object does not have the expected shape.
    pub fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }
}

/// The fields of a checkout session object that webhooks act on.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Order id from metadata, falling back to the client reference.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.metadata
            .get("order_id")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            order_id: "42".to_string(),
            order_number: "ORD-20261015-1A2B3C4D".to_string(),
            customer_email: "reader@example.com".to_string(),
            success_url: "https://shop.example.com/order/success".to_string(),
            cancel_url: "https://shop.example.com/order/cancel".to_string(),
            line_items: vec![
                CheckoutLineItem {
                    name: "The Long Road".to_string(),
                    unit_amount: Decimal::from_str("19.99").unwrap(),
                    quantity: 2,
                },
                CheckoutLineItem {
                    name: "Shipping".to_string(),
                    unit_amount: Decimal::from_str("5.00").unwrap(),
                    quantity: 1,
                },
            ],
        }
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn form_params_encode_lines_in_minor_units() {
        let params = request().form_params("USD").unwrap();

        assert_eq!(value(&params, "mode"), Some("payment"));
        assert_eq!(value(&params, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(value(&params, "line_items[0][price_data][unit_amount]"), Some("1999"));
        assert_eq!(value(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&params, "line_items[1][price_data][product_data][name]"),
            Some("Shipping")
        );
        assert_eq!(
            value(&params, "metadata[order_number]"),
            Some("ORD-20261015-1A2B3C4D")
        );
        assert_eq!(value(&params, "client_reference_id"), Some("42"));
        assert_eq!(value(&params, "metadata[order_id]"), Some("42"));
    }

    #[test]
    fn negative_line_amount_is_rejected() {
        let mut req = request();
        req.line_items[0].unit_amount = Decimal::from_str("-1.00").unwrap();
        assert!(matches!(req.form_params("usd"), Err(StripeError::Amount(_))));
    }

    #[test]
    fn event_object_decodes_checkout_session() {
        let event: StripeEvent = serde_json::from_str(
            r#"{
                "id": "evt_1",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_1",
                    "client_reference_id": "41",
                    "payment_status": "paid",
                    "payment_intent": "pi_1",
                    "metadata": {"order_id": "42", "order_number": "ORD-20261015-1A2B3C4D"}
                }}
            }"#,
        )
        .unwrap();

        assert_eq!(event.event_type, "checkout.session.completed");
        let session: CheckoutSessionObject = event.object().unwrap();
        assert_eq!(session.order_id(), Some("42"));
        assert_eq!(
            session.order_id().and_then(|id| id.parse::<author_store_core::OrderId>().ok()),
            Some(author_store_core::OrderId::new(42))
        );
        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
    }

    #[test]
    fn order_id_falls_back_to_client_reference() {
        let session: CheckoutSessionObject =
            serde_json::from_str(r#"{"id": "cs_1", "client_reference_id": "42"}"#).unwrap();
        assert_eq!(session.order_id(), Some("42"));
    }
}
