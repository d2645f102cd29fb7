//! Checkout and webhook tests against a running storefront and its database.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`store-cli migrate all`) reachable via
//!   `STOREFRONT_DATABASE_URL` or `DATABASE_URL`
//! - stripe-mock (`docker run -p 12111:12111 stripe/stripe-mock`)
//! - The storefront running with `STRIPE_API_BASE=http://localhost:12111`
//! - `STRIPE_WEBHOOK_SECRET` set to the storefront's webhook secret
//!
//! Run with: `cargo test -p author-store-integration-tests --test checkout_flow -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use author_store_integration_tests::{
    CheckoutFixture, client, database, expired_session_event, order_state, post_webhook,
    register_customer, shipping_details, storefront_base_url,
};

async fn add_to_cart(client: &Client, product_id: i32, quantity: i32) {
    let resp = client
        .post(format!("{}/api/cart/add_item", storefront_base_url()))
        .json(&json!({ "product_id": product_id, "quantity": quantity }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "add_item failed: {}", resp.status());
}

async fn apply_coupon(client: &Client, code: &str) {
    let resp = client
        .post(format!("{}/api/cart/apply_coupon", storefront_base_url()))
        .json(&json!({ "code": code }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "apply_coupon failed: {}", resp.status());
}

async fn create_order(client: &Client, customer: &Value) -> reqwest::Response {
    let email = customer["user"]["email"]
        .as_str()
        .or_else(|| customer["email"].as_str())
        .unwrap_or("reader@example.com");
    client
        .post(format!("{}/api/cart/create_order", storefront_base_url()))
        .json(&shipping_details(email))
        .send()
        .await
        .unwrap()
}

async fn cart_items(client: &Client) -> Vec<Value> {
    let cart: Value = client
        .get(format!("{}/api/cart/current", storefront_base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    cart["items"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
#[ignore = "Requires running storefront server with stripe-mock"]
async fn test_checkout_reserves_stock_and_expiry_releases_it() {
    let pool = database().await;
    let fixture = CheckoutFixture::create(&pool, 5, 3).await;
    let client = client();
    let customer = register_customer(&client).await;

    add_to_cart(&client, fixture.product_id, 2).await;
    apply_coupon(&client, &fixture.coupon_code).await;

    let resp = create_order(&client, &customer).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.unwrap();
    let order_id = placed["order_id"].as_i64().unwrap();
    assert!(placed["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert!(placed["session_id"].as_str().is_some_and(|id| !id.is_empty()));

    // Stock and the coupon use are reserved by the order; the cart is emptied
    assert_eq!(fixture.stock(&pool).await, 3);
    assert_eq!(fixture.coupon_uses(&pool).await, 1);
    assert_eq!(
        order_state(&pool, order_id).await,
        ("pending".to_string(), "pending".to_string())
    );
    assert!(cart_items(&client).await.is_empty());

    let expired = expired_session_event(order_id);
    let resp = post_webhook(&client, &expired).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(fixture.stock(&pool).await, 5);
    assert_eq!(fixture.coupon_uses(&pool).await, 0);
    assert_eq!(
        order_state(&pool, order_id).await,
        ("cancelled".to_string(), "failed".to_string())
    );

    // Replaying the same delivery changes nothing
    let resp = post_webhook(&client, &expired).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(fixture.stock(&pool).await, 5);
    assert_eq!(fixture.coupon_uses(&pool).await, 0);

    // A second, distinct expiry for the cancelled order is acknowledged but not applied
    let resp = post_webhook(&client, &expired_session_event(order_id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(fixture.stock(&pool).await, 5);
    assert_eq!(fixture.coupon_uses(&pool).await, 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server with stripe-mock"]
async fn test_checkout_rolls_back_when_stock_runs_out() {
    let pool = database().await;
    let fixture = CheckoutFixture::create(&pool, 5, 3).await;
    let client = client();
    let customer = register_customer(&client).await;

    add_to_cart(&client, fixture.product_id, 3).await;
    apply_coupon(&client, &fixture.coupon_code).await;

    // Someone else bought most of the stock after the item was carted
    fixture.set_stock(&pool, 1).await;

    let resp = create_order(&client, &customer).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        format!("Only 1 of {} available in stock", fixture.product_name)
    );

    assert_eq!(fixture.stock(&pool).await, 1);
    assert_eq!(fixture.coupon_uses(&pool).await, 0);
    assert_eq!(fixture.order_count(&pool).await, 0);
    assert_eq!(cart_items(&client).await.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server with stripe-mock"]
async fn test_checkout_consumes_last_coupon_use() {
    let pool = database().await;
    let fixture = CheckoutFixture::create(&pool, 10, 1).await;

    let first = client();
    let first_customer = register_customer(&first).await;
    add_to_cart(&first, fixture.product_id, 1).await;
    apply_coupon(&first, &fixture.coupon_code).await;

    let second = client();
    let second_customer = register_customer(&second).await;
    add_to_cart(&second, fixture.product_id, 1).await;
    apply_coupon(&second, &fixture.coupon_code).await;

    let resp = create_order(&first, &first_customer).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(fixture.coupon_uses(&pool).await, 1);

    // The cap is re-checked at checkout, so the second order is refused
    let resp = create_order(&second, &second_customer).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fixture.coupon_uses(&pool).await, 1);
    assert_eq!(fixture.order_count(&pool).await, 1);
    assert_eq!(fixture.stock(&pool).await, 9);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_with_empty_cart_is_rejected() {
    let client = client();
    let customer = register_customer(&client).await;

    let resp = create_order(&client, &customer).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Cart is empty");
}
