//! Cart to delivered order over HTTP, with the PIX provider mocked.
//!
//! Skipped unless `TEST_DATABASE_URL` is set.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use pixstore_core::{OrderId, ProductId};
use pixstore_integration_tests::{
    MockPix, create_product, database, get, json_request, send, spawn_mock_pix, test_app,
    test_config, unique,
};
use pixstore_storefront::db::{OrderRepository, StockRepository};
use pixstore_storefront::state::AppState;

struct Shop {
    app: Router,
    pool: PgPool,
    mock: Arc<MockPix>,
}

async fn shop() -> Option<Shop> {
    let pool = database().await?;
    let mock = Arc::new(MockPix::default());
    let base = spawn_mock_pix(Arc::clone(&mock)).await;
    let state = AppState::new(test_config(&base), pool.clone()).unwrap();
    Some(Shop {
        app: test_app(state),
        pool,
        mock,
    })
}

/// Register a fresh customer and return the session cookie.
async fn sign_up(app: &Router) -> String {
    let body = json!({
        "email": format!("{}@example.com", unique("buyer")),
        "password": "senha-forte-123",
        "display_name": "Comprador",
    });
    let (status, cookie, user) =
        send(app, json_request("POST", "/api/auth/register", None, &body)).await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert_eq!(user["role"], "customer");
    cookie.unwrap()
}

async fn add_to_cart(app: &Router, cookie: &str, product_id: ProductId, quantity: u32) -> Value {
    let body = json!({ "product_id": product_id, "quantity": quantity });
    let (status, _, cart) =
        send(app, json_request("POST", "/api/cart/items", Some(cookie), &body)).await;
    assert_eq!(status, StatusCode::OK, "{cart}");
    cart
}

#[tokio::test]
async fn paid_order_is_delivered_on_poll() {
    let Some(shop) = shop().await else { return };
    let (_, product_id) = create_product(&shop.pool, Decimal::new(2990, 2)).await;
    StockRepository::new(&shop.pool)
        .import(product_id, "cliente1@mail.com:senha1\ncliente2@mail.com:senha2\nextra")
        .await
        .unwrap();

    let cookie = sign_up(&shop.app).await;
    let cart = add_to_cart(&shop.app, &cookie, product_id, 2).await;
    assert_eq!(cart["totals"]["subtotal"], "59.80");
    assert_eq!(cart["totals"]["meets_minimum"], true);

    let checkout = json_request("POST", "/api/checkout", Some(&cookie), &Value::Null);
    let (status, _, order) = send(&shop.app, checkout).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], "56.81");
    assert!(order["pix_qrcode"].as_str().unwrap().starts_with("000201"));
    assert!(order.get("pix_transaction_id").is_none());
    let order_id = order["id"].as_i64().unwrap();

    {
        let queries = shop.mock.generate_queries.lock().unwrap();
        assert_eq!(queries.last().unwrap()["amount"], "56.81");
    }

    let (_, _, cart) = send(&shop.app, get("/api/cart", Some(&cookie))).await;
    assert_eq!(cart["cart"]["lines"], json!([]));

    let poll = format!("/api/orders/{order_id}/payment");
    let (status, _, waiting) = send(&shop.app, get(&poll, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(waiting["pix_status"], "PENDING");
    assert_eq!(waiting["order"]["status"], "pending");

    shop.mock.set_status("PAID_OUT");
    let (_, _, paid) = send(&shop.app, get(&poll, Some(&cookie))).await;
    assert_eq!(paid["pix_status"], "COMPLETED");
    assert_eq!(paid["order"]["status"], "delivered");
    let deliverable = paid["order"]["deliverable"].as_str().unwrap();
    assert!(deliverable.contains("cliente1@mail.com:senha1"));
    assert!(deliverable.contains("cliente2@mail.com:senha2"));

    // Polling again answers from the database.
    let verifies = shop.mock.verify_calls.load(Ordering::SeqCst);
    let (_, _, again) = send(&shop.app, get(&poll, Some(&cookie))).await;
    assert_eq!(again["order"]["deliverable"], paid["order"]["deliverable"]);
    assert_eq!(shop.mock.verify_calls.load(Ordering::SeqCst), verifies);

    assert_eq!(
        StockRepository::new(&shop.pool)
            .available_count(product_id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn failed_charge_generation_cancels_order() {
    let Some(shop) = shop().await else { return };
    shop.mock.fail_generates.store(100, Ordering::SeqCst);
    let (_, product_id) = create_product(&shop.pool, Decimal::new(2500, 2)).await;
    StockRepository::new(&shop.pool)
        .import(product_id, "cred")
        .await
        .unwrap();

    let cookie = sign_up(&shop.app).await;
    add_to_cart(&shop.app, &cookie, product_id, 1).await;

    let checkout = json_request("POST", "/api/checkout", Some(&cookie), &Value::Null);
    let (status, _, body) = send(&shop.app, checkout).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Erro ao gerar pagamento");

    let (_, _, orders) = send(&shop.app, get("/api/orders", Some(&cookie))).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "cancelled");

    // The cart survives a failed checkout.
    let (_, _, cart) = send(&shop.app, get("/api/cart", Some(&cookie))).await;
    assert_eq!(cart["totals"]["item_count"], 1);
}

#[tokio::test]
async fn checkout_rejects_more_than_available() {
    let Some(shop) = shop().await else { return };
    let (_, product_id) = create_product(&shop.pool, Decimal::new(2500, 2)).await;
    StockRepository::new(&shop.pool)
        .import(product_id, "just-one")
        .await
        .unwrap();

    let cookie = sign_up(&shop.app).await;
    add_to_cart(&shop.app, &cookie, product_id, 3).await;

    let checkout = json_request("POST", "/api/checkout", Some(&cookie), &Value::Null);
    let (status, _, _) = send(&shop.app, checkout).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(shop.mock.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn checkout_below_minimum_is_rejected() {
    let Some(shop) = shop().await else { return };
    let (_, product_id) = create_product(&shop.pool, Decimal::new(500, 2)).await;
    StockRepository::new(&shop.pool)
        .import(product_id, "cheap")
        .await
        .unwrap();

    let cookie = sign_up(&shop.app).await;
    let cart = add_to_cart(&shop.app, &cookie, product_id, 1).await;
    assert_eq!(cart["totals"]["meets_minimum"], false);

    let checkout = json_request("POST", "/api/checkout", Some(&cookie), &Value::Null);
    let (status, _, _) = send(&shop.app, checkout).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_cannot_see_each_others_orders() {
    let Some(shop) = shop().await else { return };
    let (_, product_id) = create_product(&shop.pool, Decimal::new(3000, 2)).await;
    StockRepository::new(&shop.pool)
        .import(product_id, "mine")
        .await
        .unwrap();

    let owner = sign_up(&shop.app).await;
    add_to_cart(&shop.app, &owner, product_id, 1).await;
    let checkout = json_request("POST", "/api/checkout", Some(&owner), &Value::Null);
    let (_, _, order) = send(&shop.app, checkout).await;
    let order_id = OrderId::new(i32::try_from(order["id"].as_i64().unwrap()).unwrap());

    let stranger = sign_up(&shop.app).await;
    let (status, _, _) = send(
        &shop.app,
        get(&format!("/api/orders/{order_id}"), Some(&stranger)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(
        &shop.app,
        get(&format!("/api/orders/{order_id}/payment"), Some(&stranger)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let stored = OrderRepository::new(&shop.pool).get(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status.to_string(), "pending");
}
