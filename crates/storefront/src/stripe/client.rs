//! Stripe REST client for hosted checkout sessions.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};
use url::Url;
use uuid::Uuid;

use super::error::StripeError;
use super::types::{CheckoutSession, CheckoutSessionRequest, ErrorEnvelope};
use crate::config::StripeConfig;

/// Upper bound on a single Stripe call. Checkout holds row locks while it waits.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: Url,
    secret_key: SecretString,
    webhook_secret: SecretString,
    publishable_key: String,
    currency: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base.as_str())
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Build a client whose requests give up after [`REQUEST_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Request` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StripeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            publishable_key: config.publishable_key.clone(),
            currency: config.currency.clone(),
        })
    }

    #[must_use]
    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }

    /// Endpoint secret used to verify webhook deliveries.
    #[must_use]
    pub fn webhook_secret(&self) -> &str {
        self.webhook_secret.expose_secret()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base.as_str().trim_end_matches('/'))
    }

    /// Create a hosted checkout session.
    ///
    /// `idempotency_key` is forwarded so that a retried request for the same
    /// order never opens a second session.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be encoded, fails in transit, or is
    /// rejected by Stripe.
    #[instrument(skip(self, request), fields(order_number = %request.order_number))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
        idempotency_key: Uuid,
    ) -> Result<CheckoutSession, StripeError> {
        let params = request.form_params(&self.currency)?;

        let response = self
            .client
            .post(self.endpoint("checkout/sessions"))
            .bearer_auth(self.secret_key.expose_secret())
            .header("Idempotency-Key", idempotency_key.to_string())
            .form(&params)
            .send()
            .await
            .map_err(request_error)?;

        let session: CheckoutSession = Self::decode(response).await?;
        debug!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    /// Fetch a checkout session by id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Stripe rejects it.
    #[instrument(skip(self))]
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(self.endpoint(&format!("checkout/sessions/{session_id}")))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(request_error)?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StripeError::Response(e.to_string()));
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        error!(status = status.as_u16(), %message, "Stripe API error");

        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Transport failures, timeouts included, surface as `StripeError::Request`.
fn request_error(e: reqwest::Error) -> StripeError {
    if e.is_timeout() {
        error!(timeout_secs = REQUEST_TIMEOUT.as_secs(), "Stripe request timed out");
        return StripeError::Request(format!("timed out after {}s", REQUEST_TIMEOUT.as_secs()));
    }
    StripeError::Request(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_abc"),
            publishable_key: "pk_test_abc".to_string(),
            webhook_secret: SecretString::from("whsec_abc"),
            api_base: Url::parse(api_base).unwrap(),
            currency: "usd".to_string(),
        }
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = StripeClient::new(&config("https://api.stripe.com/")).unwrap();
        assert_eq!(
            client.endpoint("checkout/sessions"),
            "https://api.stripe.com/v1/checkout/sessions"
        );
    }

    #[tokio::test]
    async fn hung_provider_times_out_as_request_error() {
        use tokio::io::AsyncReadExt;

        // Accepts the connection, reads the request and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let http = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let err = http
            .get(format!("http://{addr}/v1/checkout/sessions/cs_test"))
            .send()
            .await
            .map_err(request_error)
            .unwrap_err();

        assert!(matches!(err, StripeError::Request(message) if message.starts_with("timed out")));
    }

    #[test]
    fn debug_redacts_keys() {
        let client = StripeClient::new(&config("https://api.stripe.com")).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk_test_abc"));
        assert!(!debug.contains("whsec_abc"));
        assert!(debug.contains("[REDACTED]"));
    }
}
