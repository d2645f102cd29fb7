//! HTTP tests against a running admin panel.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The admin server running (`cargo run -p author-store-admin`)
//! - A staff account in `ADMIN_TEST_USERNAME` / `ADMIN_TEST_PASSWORD`
//!
//! Run with: `cargo test -p author-store-integration-tests -- --ignored`

use reqwest::StatusCode;
use reqwest::header::LOCATION;
use serde_json::Value;

use author_store_integration_tests::{admin_base_url, admin_login, client};

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_pages_redirect_to_login() {
    let client = client();
    let base_url = admin_base_url();

    for path in ["/", "/orders", "/products", "/coupons", "/reviews", "/inventory"] {
        let resp = client.get(format!("{base_url}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(
            resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/auth/login"),
            "{path}"
        );
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_requires_session() {
    let client = client();
    let resp = client
        .get(format!("{}/api/analytics/dashboard", admin_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_bad_credentials_rerender_form() {
    let client = client();
    let resp = client
        .post(format!("{}/auth/login", admin_base_url()))
        .form(&[("username", "nobody"), ("password", "definitely wrong")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Invalid username or password"));
    assert!(body.contains("value=\"nobody\""));
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_security_headers_present() {
    let client = client();
    let resp = client
        .get(format!("{}/auth/login", admin_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-frame-options").and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
}

// ============================================================================
// Signed-in Pages
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and staff credentials"]
async fn test_dashboard_json_shape() {
    let client = client();
    admin_login(&client).await;

    let data: Value = client
        .get(format!("{}/api/analytics/dashboard", admin_base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for key in [
        "sales",
        "top_products",
        "recent_orders",
        "order_statuses",
        "payment_statuses",
        "customers",
        "inventory",
        "reviews",
        "daily_sales",
    ] {
        assert!(data.get(key).is_some(), "missing {key}");
    }
    assert_eq!(data["daily_sales"].as_array().map(Vec::len), Some(30));
    assert_eq!(data["order_statuses"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
#[ignore = "Requires running admin server and staff credentials"]
async fn test_signed_in_pages_render() {
    let client = client();
    admin_login(&client).await;
    let base_url = admin_base_url();

    for path in [
        "/",
        "/orders",
        "/orders?status=pending",
        "/products",
        "/categories",
        "/coupons",
        "/reviews?status=approved",
        "/inventory",
    ] {
        let resp = client.get(format!("{base_url}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }

    let resp = client
        .get(format!("{base_url}/orders?status=lost"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server and staff credentials"]
async fn test_invalid_coupon_is_rejected() {
    let client = client();
    admin_login(&client).await;

    let resp = client
        .post(format!("{}/coupons", admin_base_url()))
        .form(&[
            ("code", "TOO-GENEROUS"),
            ("discount_type", "percentage"),
            ("discount_value", "150"),
            ("max_uses", "10"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("percentage discounts cannot exceed 100"));
}

#[tokio::test]
#[ignore = "Requires running admin server and staff credentials"]
async fn test_bulk_update_reports_failures() {
    let client = client();
    admin_login(&client).await;

    let resp = client
        .post(format!("{}/orders/bulk", admin_base_url()))
        .form(&[("action", "mark_delivered"), ("order_ids", "2147483647")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
}
