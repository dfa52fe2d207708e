//! Router tests that need neither a database nor the PIX provider.
//!
//! The state's pool points at a closed port, so these only cover paths that
//! are decided before any query runs.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;
use tower::ServiceExt;

use pixstore_integration_tests::{get, json_request, lazy_state, send, test_app};
use pixstore_storefront::models::StoreSettings;

#[tokio::test]
async fn health_is_ok() {
    let app = test_app(lazy_state());
    let (status, _, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn readiness_fails_without_database() {
    let app = test_app(lazy_state());
    let (status, _, _) = send(&app, get("/health/ready", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn customer_routes_require_sign_in() {
    let app = test_app(lazy_state());
    for uri in [
        "/api/orders",
        "/api/orders/1",
        "/api/auth/me",
        "/api/account/profile",
        "/api/support/tickets",
        "/api/events",
    ] {
        let (status, _, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "Authentication required", "{uri}");
    }
}

#[tokio::test]
async fn checkout_requires_sign_in() {
    let app = test_app(lazy_state());
    let (status, _, _) = send(&app, json_request("POST", "/api/checkout", None, &json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_sign_in() {
    let app = test_app(lazy_state());
    for uri in [
        "/api/admin/products",
        "/api/admin/orders",
        "/api/admin/users",
        "/api/admin/dashboard",
        "/api/admin/settings",
        "/api/admin/support/tickets",
    ] {
        let (status, _, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = test_app(lazy_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn upstream_request_id_is_echoed() {
    let app = test_app(lazy_state());
    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "edge-1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-1234");
}

#[tokio::test]
async fn settings_are_served_from_cache() {
    let state = lazy_state();
    state
        .prime_settings(StoreSettings {
            minimum_order_value: Decimal::new(3500, 2),
            pix_discount_percent: Decimal::from(10),
        })
        .await;
    let app = test_app(state);

    let (status, _, body) = send(&app, get("/api/settings", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minimum_order_value"], "35.00");
    assert_eq!(body["pix_discount_percent"], "10");
}

#[tokio::test]
async fn empty_cart_reports_minimum() {
    let state = lazy_state();
    state.prime_settings(StoreSettings::default()).await;
    let app = test_app(state);

    let (status, _, body) = send(&app, get("/api/cart", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["lines"], json!([]));
    assert_eq!(body["totals"]["item_count"], 0);
    assert_eq!(body["totals"]["minimum_order_value"], "20.00");
    assert_eq!(body["totals"]["meets_minimum"], false);
}

#[tokio::test]
async fn updating_item_not_in_cart_is_not_found() {
    let state = lazy_state();
    state.prime_settings(StoreSettings::default()).await;
    let app = test_app(state);

    let (status, _, body) = send(
        &app,
        json_request("PATCH", "/api/cart/items/42", None, &json!({ "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn adding_zero_quantity_is_rejected() {
    let app = test_app(lazy_state());
    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/cart/items",
            None,
            &json!({ "product_id": 1, "quantity": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_malformed_email_is_bad_request() {
    let app = test_app(lazy_state());
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": "not-an-email", "password": "whatever123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn register_with_short_password_is_bad_request() {
    let app = test_app(lazy_state());
    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "email": "cliente@example.com", "password": "1234" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_routes_are_rate_limited() {
    let app = test_app(lazy_state());
    let body = json!({ "email": "nope", "password": "whatever123" });

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let request = json_request("POST", "/api/auth/login", None, &body);
        let (status, _, _) = send(&app, request).await;
        statuses.push(status);
    }

    assert_eq!(statuses[0], StatusCode::BAD_REQUEST);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn logout_without_session_is_no_content() {
    let app = test_app(lazy_state());
    let request = json_request("POST", "/api/auth/logout", None, &serde_json::Value::Null);
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
