//! Payment reconciliation around the end of the payment window.
//!
//! Skipped unless `TEST_DATABASE_URL` is set.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use url::Url;

use pixstore_core::{OrderStatus, PixStatus, ProductId, UserRole, parse_deliverable};
use pixstore_integration_tests::{
    MockPix, UNREACHABLE_PIX, create_product, create_user, database, spawn_mock_pix, test_config,
    unique,
};
use pixstore_storefront::db::orders::{NewOrderItem, OrderAmounts};
use pixstore_storefront::db::{OrderRepository, StockRepository};
use pixstore_storefront::models::Order;
use pixstore_storefront::services::checkout::CheckoutService;
use pixstore_storefront::services::events::{EventBus, StoreEvent};
use pixstore_storefront::services::pix::PixClient;

const WINDOW: Duration = Duration::from_secs(15 * 60);

/// A pending order with a PIX charge expiring at `expires_at`.
async fn charged_order(
    pool: &PgPool,
    product_id: ProductId,
    transaction_id: &str,
    expires_at: DateTime<Utc>,
) -> Order {
    let user = create_user(pool, UserRole::Customer).await;
    let total = Decimal::new(2500, 2);
    let orders = OrderRepository::new(pool);
    let order = orders
        .create(
            user.id,
            OrderAmounts {
                subtotal: total,
                discount: Decimal::ZERO,
                total,
            },
            &[NewOrderItem {
                product_id,
                product_name: "Licença Pro".to_string(),
                product_image: String::new(),
                price: total,
                quantity: 1,
            }],
        )
        .await
        .unwrap()
        .order;
    orders
        .attach_charge(order.id, transaction_id, "000201qr", expires_at)
        .await
        .unwrap()
}

fn five_seconds_ago() -> DateTime<Utc> {
    Utc::now() - TimeDelta::seconds(5)
}

async fn stocked_product(pool: &PgPool, credential: &str) -> ProductId {
    let (_, product_id) = create_product(pool, Decimal::new(2500, 2)).await;
    StockRepository::new(pool).import(product_id, credential).await.unwrap();
    product_id
}

#[tokio::test]
async fn late_payment_after_window_is_still_delivered() {
    let Some(pool) = database().await else { return };
    let mock = Arc::new(MockPix::default());
    let base = spawn_mock_pix(Arc::clone(&mock)).await;
    let pix = PixClient::new(&test_config(&base).pix).unwrap();
    let events = EventBus::default();

    let product_id = stocked_product(&pool, "atrasado@mail.com:pago").await;
    let tx = unique("tx");
    let order = charged_order(&pool, product_id, &tx, five_seconds_ago()).await;
    assert!(order.is_expired(Utc::now()));
    mock.set_transaction_status(&tx, "PAID_OUT");

    let status = CheckoutService::new(&pool, &pix, &events, WINDOW)
        .reconcile(order)
        .await
        .unwrap();

    assert_eq!(status.pix_status, PixStatus::Completed);
    assert_eq!(status.order.status, OrderStatus::Delivered);
    let lines = parse_deliverable(status.order.deliverable.as_deref().unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().credential, "atrasado@mail.com:pago");
    assert_eq!(StockRepository::new(&pool).available_count(product_id).await.unwrap(), 0);
}

#[tokio::test]
async fn unpaid_order_past_window_is_cancelled() {
    let Some(pool) = database().await else { return };
    let mock = Arc::new(MockPix::default());
    let base = spawn_mock_pix(Arc::clone(&mock)).await;
    let pix = PixClient::new(&test_config(&base).pix).unwrap();
    let events = EventBus::default();
    let mut rx = events.subscribe();

    let product_id = stocked_product(&pool, "sobra@mail.com:1").await;
    let order = charged_order(&pool, product_id, &unique("tx"), five_seconds_ago()).await;
    let order_id = order.id;

    let status = CheckoutService::new(&pool, &pix, &events, WINDOW)
        .reconcile(order)
        .await
        .unwrap();

    assert_eq!(mock.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.pix_status, PixStatus::Failed);
    assert_eq!(status.order.status, OrderStatus::Cancelled);
    let event = rx.try_recv().unwrap();
    assert!(matches!(
        event,
        StoreEvent::OrderChanged {
            order_id: id,
            status: OrderStatus::Cancelled,
            ..
        } if id == order_id
    ));
    assert_eq!(StockRepository::new(&pool).available_count(product_id).await.unwrap(), 1);
}

#[tokio::test]
async fn unreachable_provider_leaves_expired_order_pending() {
    let Some(pool) = database().await else { return };
    let pix = PixClient::new(&test_config(&Url::parse(UNREACHABLE_PIX).unwrap()).pix).unwrap();
    let events = EventBus::default();

    let (_, product_id) = create_product(&pool, Decimal::new(2500, 2)).await;
    let order = charged_order(&pool, product_id, &unique("tx"), five_seconds_ago()).await;
    let order_id = order.id;

    let status = CheckoutService::new(&pool, &pix, &events, WINDOW)
        .reconcile(order)
        .await
        .unwrap();

    assert_eq!(status.pix_status, PixStatus::Pending);
    let stored = OrderRepository::new(&pool).get(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn open_window_waits_for_payment() {
    let Some(pool) = database().await else { return };
    let mock = Arc::new(MockPix::default());
    let base = spawn_mock_pix(Arc::clone(&mock)).await;
    let pix = PixClient::new(&test_config(&base).pix).unwrap();
    let events = EventBus::default();

    let (_, product_id) = create_product(&pool, Decimal::new(2500, 2)).await;
    let expires_at = Utc::now() + TimeDelta::minutes(10);
    let order = charged_order(&pool, product_id, &unique("tx"), expires_at).await;

    let status = CheckoutService::new(&pool, &pix, &events, WINDOW)
        .reconcile(order)
        .await
        .unwrap();

    assert_eq!(status.pix_status, PixStatus::Pending);
    assert_eq!(status.order.status, OrderStatus::Pending);
}
