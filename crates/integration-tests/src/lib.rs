//! Integration tests for Author Store.
//!
//! # Running Tests
//!
//! ```bash
//! # Cross-crate rule tests (no services needed)
//! cargo test -p author-store-integration-tests
//!
//! # HTTP tests against running servers
//! cargo run -p author-store-cli -- migrate all
//! cargo run -p author-store-storefront &
//! cargo run -p author-store-admin &
//! cargo test -p author-store-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` (default `http://localhost:3000`)
//! - `ADMIN_BASE_URL` (default `http://localhost:3001`)
//! - `ADMIN_TEST_USERNAME`, `ADMIN_TEST_PASSWORD` - a staff account created
//!   with `store-cli admin create`
//! - `STRIPE_WEBHOOK_SECRET` - the storefront's webhook secret
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - the storefront database,
//!   used by checkout tests to set up fixtures and inspect stock
//!
//! Checkout tests need the storefront started with `STRIPE_API_BASE` pointing
//! at [stripe-mock](https://github.com/stripe/stripe-mock), e.g.
//! `STRIPE_API_BASE=http://localhost:12111`.

use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use author_store_storefront::stripe::sign_payload;

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin panel.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies and does not follow redirects, so
/// tests can assert on them.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh customer username and email for one test run.
#[must_use]
pub fn unique_customer() -> (String, String) {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let tag = tag.get(..10).unwrap_or(&tag).to_string();
    (format!("reader_{tag}"), format!("reader+{tag}@example.com"))
}

/// Register and sign in a new customer on `client`.
///
/// # Panics
///
/// Panics if registration does not succeed.
pub async fn register_customer(client: &Client) -> Value {
    let (username, email) = unique_customer();
    let resp = client
        .post(format!("{}/api/auth/register", storefront_base_url()))
        .json(&json!({
            "username": username,
            "email": email,
            "password": "a long enough password",
            "first_name": "Test",
            "last_name": "Reader",
        }))
        .send()
        .await
        .expect("Failed to register customer");

    assert!(
        resp.status().is_success(),
        "registration failed: {}",
        resp.status()
    );
    resp.json().await.expect("Failed to parse registration response")
}

/// Sign in to the admin panel with the test staff account.
///
/// # Panics
///
/// Panics if the credentials are not set or the login is rejected.
pub async fn admin_login(client: &Client) {
    let username = std::env::var("ADMIN_TEST_USERNAME").expect("ADMIN_TEST_USERNAME not set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set");

    let resp = client
        .post(format!("{}/auth/login", admin_base_url()))
        .form(&[("username", username.as_str()), ("password", password.as_str())])
        .send()
        .await
        .expect("Failed to post admin login");

    assert!(
        resp.status().is_redirection(),
        "admin login failed: {}",
        resp.status()
    );
}

/// The first product in the public catalog that can be bought.
///
/// # Panics
///
/// Panics if the catalog has no in-stock product.
pub async fn first_in_stock_product(client: &Client) -> Value {
    let products: Vec<Value> = client
        .get(format!("{}/api/products?in_stock=true", storefront_base_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse product list");

    products
        .into_iter()
        .next()
        .expect("Seed the catalog with at least one in-stock product")
}

/// Connect to the storefront database.
///
/// # Panics
///
/// Panics if no database URL is set or the connection fails.
pub async fn database() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL or DATABASE_URL not set");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to storefront database")
}

/// A product and a coupon created for one test, so stock and usage counts
/// are not shared with anything else.
#[derive(Debug, Clone)]
pub struct CheckoutFixture {
    pub product_id: i32,
    pub product_name: String,
    pub coupon_id: i32,
    pub coupon_code: String,
}

impl CheckoutFixture {
    /// Insert a category, a 12.50 product with `stock` units and a 10%
    /// coupon allowing `max_uses` uses.
    ///
    /// # Panics
    ///
    /// Panics if an insert fails.
    pub async fn create(pool: &PgPool, stock: i32, max_uses: i32) -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let tag = tag.get(..10).unwrap_or(&tag).to_string();

        let category_id: i32 = sqlx::query_scalar(
            "INSERT INTO store.category (name, slug) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("Checkout {tag}"))
        .bind(format!("checkout-{tag}"))
        .fetch_one(pool)
        .await
        .expect("Failed to insert category");

        let product_name = format!("Fixture Novel {tag}");
        let product_id: i32 = sqlx::query_scalar(
            "INSERT INTO store.product (category_id, name, slug, price, stock) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(category_id)
        .bind(&product_name)
        .bind(format!("fixture-novel-{tag}"))
        .bind(Decimal::new(1250, 2))
        .bind(stock)
        .fetch_one(pool)
        .await
        .expect("Failed to insert product");

        let coupon_code = format!("CHECKOUT{}", tag.to_uppercase());
        let coupon_id: i32 = sqlx::query_scalar(
            "INSERT INTO store.coupon (code, discount_type, discount_value, max_uses) \
             VALUES ($1, 'percentage', 10, $2) RETURNING id",
        )
        .bind(&coupon_code)
        .bind(max_uses)
        .fetch_one(pool)
        .await
        .expect("Failed to insert coupon");

        Self {
            product_id,
            product_name,
            coupon_id,
            coupon_code,
        }
    }

    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn stock(&self, pool: &PgPool) -> i32 {
        sqlx::query_scalar("SELECT stock FROM store.product WHERE id = $1")
            .bind(self.product_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read stock")
    }

    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn set_stock(&self, pool: &PgPool, stock: i32) {
        sqlx::query("UPDATE store.product SET stock = $2 WHERE id = $1")
            .bind(self.product_id)
            .bind(stock)
            .execute(pool)
            .await
            .expect("Failed to set stock");
    }

    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn coupon_uses(&self, pool: &PgPool) -> i32 {
        sqlx::query_scalar("SELECT used_count FROM store.coupon WHERE id = $1")
            .bind(self.coupon_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read coupon usage")
    }

    /// Orders that used this fixture's coupon.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn order_count(&self, pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM store.order WHERE coupon_id = $1")
            .bind(self.coupon_id)
            .fetch_one(pool)
            .await
            .expect("Failed to count orders")
    }
}

/// `(status, payment_status)` of an order.
///
/// # Panics
///
/// Panics if the order does not exist.
pub async fn order_state(pool: &PgPool, order_id: i64) -> (String, String) {
    sqlx::query_as("SELECT status::TEXT, payment_status::TEXT FROM store.order WHERE id = $1")
        .bind(i32::try_from(order_id).expect("order id fits in i32"))
        .fetch_one(pool)
        .await
        .expect("Failed to read order")
}

/// A complete checkout body for `email`.
#[must_use]
pub fn shipping_details(email: &str) -> Value {
    json!({
        "email": email,
        "first_name": "Test",
        "last_name": "Reader",
        "address_line1": "1 Library Lane",
        "city": "Portland",
        "state": "OR",
        "postal_code": "97201",
        "country": "US",
        "phone": "555-0100",
    })
}

/// Deliver `event` to the storefront webhook, signed with `STRIPE_WEBHOOK_SECRET`.
///
/// # Panics
///
/// Panics if the secret is not set or the request fails.
pub async fn post_webhook(client: &Client, event: &Value) -> Response {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET not set");
    let payload = serde_json::to_vec(event).expect("Failed to encode event");
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_payload(&payload, timestamp, &secret);

    client
        .post(format!("{}/api/stripe/webhook", storefront_base_url()))
        .header("Stripe-Signature", format!("t={timestamp},v1={signature}"))
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await
        .expect("Failed to post webhook")
}

/// A `checkout.session.expired` event for `order_id` with fresh event and
/// session ids, so the order is found through its metadata.
#[must_use]
pub fn expired_session_event(order_id: i64) -> Value {
    let event_id = format!("evt_{}", uuid::Uuid::new_v4().simple());
    let session_id = format!("cs_test_{}", uuid::Uuid::new_v4().simple());
    json!({
        "id": event_id,
        "type": "checkout.session.expired",
        "data": {"object": {
            "id": session_id,
            "client_reference_id": order_id.to_string(),
            "payment_status": "unpaid",
            "metadata": {"order_id": order_id.to_string()},
        }},
    })
}
