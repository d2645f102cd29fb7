//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database with a seeded catalog
//!   (`store-cli migrate all`, `store-cli seed catalog -f ...`)
//! - The storefront server running (`cargo run -p author-store-storefront`)
//!
//! Run with: `cargo test -p author-store-integration-tests -- --ignored`

use reqwest::StatusCode;
use serde_json::{Value, json};

use author_store_integration_tests::{
    client, first_in_stock_product, register_customer, storefront_base_url,
};

// ============================================================================
// Health & Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client.get(format!("{base_url}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_product_listing_filters() {
    let client = client();
    let base_url = storefront_base_url();

    let products: Vec<Value> = client
        .get(format!("{base_url}/api/products?ordering=price"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let prices: Vec<f64> = products
        .iter()
        .filter_map(|p| p["price"].as_str()?.parse().ok())
        .collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]), "not sorted: {prices:?}");
    assert!(products.iter().all(|p| p["is_available"] == json!(true)));

    let resp = client
        .get(format!("{base_url}/api/products/no-such-book"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Guest Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_guest_cart_flow() {
    let client = client();
    let base_url = storefront_base_url();
    let product = first_in_stock_product(&client).await;

    let cart: Value = client
        .post(format!("{base_url}/api/cart/add_item"))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["total_items"], json!(1));
    let line_id = cart["items"][0]["id"].clone();

    // Adding the same product merges into one line
    let cart: Value = client
        .post(format!("{base_url}/api/cart/add_item"))
        .json(&json!({ "product_id": product["id"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["items"][0]["quantity"], json!(2));

    // Quantity zero removes the line
    let cart: Value = client
        .post(format!("{base_url}/api/cart/update_item"))
        .json(&json!({ "cart_item_id": line_id, "quantity": 0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["total_items"], json!(0));
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_add_more_than_stock_is_rejected() {
    let client = client();
    let base_url = storefront_base_url();
    let product = first_in_stock_product(&client).await;
    let too_many = product["stock"].as_i64().unwrap_or(0) + 1;

    let resp = client
        .post(format!("{base_url}/api/cart/add_item"))
        .json(&json!({ "product_id": product["id"], "quantity": too_many }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| e.contains("available")));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_coupon_is_rejected() {
    let client = client();
    let resp = client
        .post(format!("{}/api/cart/apply_coupon", storefront_base_url()))
        .json(&json!({ "code": "NO-SUCH-CODE" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], json!("Invalid coupon code"));
}

// ============================================================================
// Accounts & Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_requires_login() {
    let client = client();
    let resp = client
        .post(format!("{}/api/cart/create_order", storefront_base_url()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_then_current_user() {
    let client = client();
    let base_url = storefront_base_url();
    let registered = register_customer(&client).await;

    let me: Value = client
        .get(format!("{base_url}/api/auth/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], registered["user"]["username"]);

    let resp = client
        .get(format!("{base_url}/api/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    client
        .post(format!("{base_url}/api/auth/logout"))
        .send()
        .await
        .unwrap();
    let resp = client
        .get(format!("{base_url}/api/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unsigned_webhook_is_rejected() {
    let client = client();
    let resp = client
        .post(format!("{}/api/stripe/webhook", storefront_base_url()))
        .header("Stripe-Signature", "t=1,v1=deadbeef")
        .body(r#"{"id":"evt_fake","type":"checkout.session.completed"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
