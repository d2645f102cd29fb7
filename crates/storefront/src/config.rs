//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STRIPE_SECRET_KEY` - Payment provider secret API key
//! - `STRIPE_PUBLISHABLE_KEY` - Payment provider publishable key (sent to browsers)
//! - `STRIPE_WEBHOOK_SECRET` - Webhook endpoint signing secret
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_PUBLIC_URL` - Origin of the customer-facing site, used for
//!   checkout redirect URLs (default: `http://localhost:3000`)
//! - `STRIPE_API_BASE` - Payment API base URL (default: `https://api.stripe.com`)
//! - `STORE_CURRENCY` - ISO currency code, lower-case (default: usd)
//! - `STORE_SHIPPING_FLAT_RATE` - Flat shipping per order (default: 5.00)
//! - `STORE_TAX_RATE` - Tax rate as a fraction (default: 0.08)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   Outgoing mail; order confirmations are skipped when `SMTP_HOST` is unset
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use author_store_core::PricingPolicy;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Values that show up when someone copies `.env.example` without editing it.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Origin of the customer-facing site
    pub public_url: Url,
    pub stripe: StripeConfig,
    pub pricing: PricingPolicy,
    /// Outgoing mail, `None` when SMTP is not configured
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Payment provider credentials.
///
/// Implements `Debug` manually to redact the secret key and webhook secret.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    /// Safe to expose to browsers
    pub publishable_key: String,
    pub webhook_secret: SecretString,
    pub api_base: Url,
    pub currency: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .field("currency", &self.currency)
            .finish()
    }
}

/// SMTP settings for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// From header, e.g. `Author Store <orders@example.com>`
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or malformed,
    /// or if a secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env::<u16>("STOREFRONT_PORT", "3000")?;
        let public_url = parse_env::<Url>("STOREFRONT_PUBLIC_URL", "http://localhost:3000")?;
        let stripe = StripeConfig::from_env()?;
        let pricing = pricing_from_env()?;
        let email = EmailConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            stripe,
            pricing,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Session cookies are marked `Secure` when the public site is served over TLS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.public_url.scheme() == "https"
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STORE_CURRENCY", "usd").to_ascii_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "STORE_CURRENCY".to_string(),
                "expected a three-letter ISO currency code".to_string(),
            ));
        }

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            publishable_key: get_required_env("STRIPE_PUBLISHABLE_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            api_base: parse_env::<Url>("STRIPE_API_BASE", "https://api.stripe.com")?,
            currency,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env::<u16>("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

fn pricing_from_env() -> Result<PricingPolicy, ConfigError> {
    let shipping_flat_rate = parse_env::<Decimal>("STORE_SHIPPING_FLAT_RATE", "5.00")?;
    let tax_rate = parse_env::<Decimal>("STORE_TAX_RATE", "0.08")?;

    if shipping_flat_rate.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "STORE_SHIPPING_FLAT_RATE".to_string(),
            "cannot be negative".to_string(),
        ));
    }
    if tax_rate.is_sign_negative() || tax_rate >= Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "STORE_TAX_RATE".to_string(),
            "must be a fraction between 0 and 1".to_string(),
        ));
    }

    Ok(PricingPolicy {
        shipping_flat_rate,
        tax_rate,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_51Hq2xKLmNoPqRsTuVwXyZ"),
            publishable_key: "pk_test_visible".to_string(),
            webhook_secret: SecretString::from("whsec_9fJ2kLm3NpQ4rS5t"),
            api_base: Url::parse("https://api.stripe.com").unwrap(),
            currency: "usd".to_string(),
        }
    }

    #[test]
    fn entropy_of_uniform_and_mixed_strings() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("zzzzzz").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("sk_test_51Hq2xKLmNoPqRsTuVwXyZ") > 3.3);
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        for bad in ["your-stripe-key", "changeme123", "sk_test_xxxxxxxx"] {
            assert!(matches!(
                validate_secret_strength(bad, "STRIPE_SECRET_KEY"),
                Err(ConfigError::InsecureSecret(_, _))
            ));
        }
    }

    #[test]
    fn low_entropy_secrets_are_rejected() {
        assert!(validate_secret_strength("aaaaaaaabbbbbbbb", "STRIPE_WEBHOOK_SECRET").is_err());
    }

    #[test]
    fn realistic_keys_pass() {
        assert!(validate_secret_strength("sk_test_51Hq2xKLmNoPqRsTuVwXyZ", "K").is_ok());
        assert!(validate_secret_strength("whsec_9fJ2kLm3NpQ4rS5t", "K").is_ok());
    }

    #[test]
    fn stripe_debug_redacts_secrets() {
        let output = format!("{:?}", stripe_config());
        assert!(output.contains("pk_test_visible"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("sk_test_51Hq2x"));
        assert!(!output.contains("whsec_9fJ2"));
    }

    #[test]
    fn socket_addr_and_https_detection() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/store"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            public_url: Url::parse("https://shop.example.org").unwrap(),
            stripe: stripe_config(),
            pricing: PricingPolicy::default(),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        assert_eq!(config.socket_addr().port(), 8080);
        assert!(config.is_https());
    }
}
