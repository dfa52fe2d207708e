//! Stock claiming and payment confirmation against a real database.
//!
//! Skipped unless `TEST_DATABASE_URL` is set.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::PgPool;

use pixstore_core::{
    OUT_OF_STOCK_PLACEHOLDER, OrderId, OrderStatus, ProductId, UserRole, parse_deliverable,
};
use pixstore_integration_tests::{create_product, create_user, database};
use pixstore_storefront::db::orders::{NewOrderItem, OrderAmounts};
use pixstore_storefront::db::support::NewMessage;
use pixstore_storefront::db::{
    OrderRepository, RepositoryError, StockRepository, SupportRepository,
};
use pixstore_storefront::services::events::{EventBus, StoreEvent};
use pixstore_storefront::services::fulfillment::{assign, fulfill};

async fn pending_order(pool: &PgPool, product_id: ProductId, quantity: u32) -> OrderId {
    let user = create_user(pool, UserRole::Customer).await;
    let total = Decimal::new(1000, 2) * Decimal::from(quantity);
    OrderRepository::new(pool)
        .create(
            user.id,
            OrderAmounts {
                subtotal: total,
                discount: Decimal::ZERO,
                total,
            },
            &[NewOrderItem {
                product_id,
                product_name: "Conta Streaming".to_string(),
                product_image: String::new(),
                price: Decimal::new(1000, 2),
                quantity,
            }],
        )
        .await
        .unwrap()
        .order
        .id
}

#[tokio::test]
async fn concurrent_confirmations_deliver_once() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    StockRepository::new(&pool)
        .import(product_id, "a@x.com:1\nb@x.com:2\nc@x.com:3\nd@x.com:4")
        .await
        .unwrap();
    let order_id = pending_order(&pool, product_id, 2).await;
    let events = EventBus::default();

    let attempts = (0..8).map(|_| fulfill(&pool, &events, order_id));
    let results = futures::future::join_all(attempts).await;

    let delivered_now = results
        .iter()
        .filter(|r| r.as_ref().unwrap().delivered_now)
        .count();
    assert_eq!(delivered_now, 1);

    let stock = StockRepository::new(&pool);
    assert_eq!(stock.available_count(product_id).await.unwrap(), 2);

    let order = OrderRepository::new(&pool).get(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.paid_at.is_some());
    let lines = parse_deliverable(order.deliverable.as_deref().unwrap());
    assert_eq!(lines.len(), 2);
    assert_ne!(lines[0].credential, lines[1].credential);
}

#[tokio::test]
async fn credentials_are_never_shared_between_orders() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    let raw: String = (0..6).map(|i| format!("user{i}@mail.com:senha{i}\n")).collect();
    StockRepository::new(&pool).import(product_id, &raw).await.unwrap();

    let mut orders = Vec::new();
    for _ in 0..3 {
        orders.push(pending_order(&pool, product_id, 2).await);
    }

    let events = EventBus::default();
    let handles: Vec<_> = orders
        .iter()
        .map(|&order_id| {
            let pool = pool.clone();
            let events = events.clone();
            tokio::spawn(async move { fulfill(&pool, &events, order_id).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().delivered_now);
    }

    let repo = OrderRepository::new(&pool);
    let mut seen = HashSet::new();
    for order_id in orders {
        let order = repo.get(order_id).await.unwrap().unwrap();
        for line in parse_deliverable(order.deliverable.as_deref().unwrap()) {
            assert_ne!(line.credential, OUT_OF_STOCK_PLACEHOLDER);
            assert!(seen.insert(line.credential), "credential delivered twice");
        }
    }
    assert_eq!(seen.len(), 6);
    assert_eq!(
        StockRepository::new(&pool).available_count(product_id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn empty_pool_delivers_placeholder() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    StockRepository::new(&pool)
        .import(product_id, "only@one.com:123")
        .await
        .unwrap();
    let order_id = pending_order(&pool, product_id, 2).await;

    let result = fulfill(&pool, &EventBus::default(), order_id).await.unwrap();

    assert!(result.delivered_now);
    let lines = parse_deliverable(result.order.deliverable.as_deref().unwrap());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].credential, "only@one.com:123");
    assert_eq!(lines[1].credential, OUT_OF_STOCK_PLACEHOLDER);
}

#[tokio::test]
async fn fulfill_publishes_order_and_stock_events() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    StockRepository::new(&pool)
        .import(product_id, "one\ntwo")
        .await
        .unwrap();
    let order_id = pending_order(&pool, product_id, 1).await;

    let events = EventBus::default();
    let mut receiver = events.subscribe();
    fulfill(&pool, &events, order_id).await.unwrap();

    let mut saw_order = false;
    let mut stock_level = None;
    while let Ok(event) = receiver.try_recv() {
        match event {
            StoreEvent::OrderChanged { order_id: id, status, .. } if id == order_id => {
                assert_eq!(status, OrderStatus::Delivered);
                saw_order = true;
            }
            StoreEvent::StockChanged { product_id: id, available } if id == product_id => {
                stock_level = Some(available);
            }
            _ => {}
        }
    }
    assert!(saw_order);
    assert_eq!(stock_level, Some(1));
}

#[tokio::test]
async fn cancelled_order_is_not_fulfilled() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    StockRepository::new(&pool).import(product_id, "x").await.unwrap();
    let order_id = pending_order(&pool, product_id, 1).await;

    OrderRepository::new(&pool)
        .cancel_if_pending(order_id)
        .await
        .unwrap()
        .unwrap();
    let result = fulfill(&pool, &EventBus::default(), order_id).await.unwrap();

    assert!(!result.delivered_now);
    assert_eq!(result.order.status, OrderStatus::Cancelled);
    assert_eq!(
        StockRepository::new(&pool).available_count(product_id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn manual_assignment_reports_empty_pool() {
    let Some(pool) = database().await else { return };
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    StockRepository::new(&pool).import(product_id, "manual-1").await.unwrap();
    let order_id = pending_order(&pool, product_id, 1).await;
    let events = EventBus::default();

    let first = assign(&pool, &events, product_id, order_id).await.unwrap();
    assert_eq!(first.credential.as_deref(), Some("manual-1"));
    assert!(first.error.is_none());

    let second = assign(&pool, &events, product_id, order_id).await.unwrap();
    assert!(second.credential.is_none());
    assert_eq!(second.error.as_deref(), Some("No stock available"));
}

#[tokio::test]
async fn repeated_client_message_id_is_stored_once() {
    let Some(pool) = database().await else { return };
    let user = create_user(&pool, UserRole::Customer).await;
    let support = SupportRepository::new(&pool);
    let (ticket, _) = support
        .create_ticket(user.id, "Senha incorreta", "A senha não funciona")
        .await
        .unwrap();

    let new = NewMessage {
        sender_id: user.id,
        is_admin: false,
        message: "Alguma novidade?",
        client_message_id: Some("msg-1"),
    };
    let (first, inserted) = support.add_message(ticket.id, &new).await.unwrap();
    assert!(inserted);
    let (second, inserted) = support.add_message(ticket.id, &new).await.unwrap();
    assert!(!inserted);
    assert_eq!(first.id, second.id);

    let messages = support.messages(ticket.id, None).await.unwrap();
    assert_eq!(messages.len(), 2);

    let after = support.messages(ticket.id, Some(messages[0].id)).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, first.id);
}

#[tokio::test]
async fn quantity_beyond_column_range_is_rejected() {
    let Some(pool) = database().await else { return };
    let user = create_user(&pool, UserRole::Customer).await;
    let (_, product_id) = create_product(&pool, Decimal::new(1000, 2)).await;
    let orders = OrderRepository::new(&pool);
    let before = orders.list_for_user(user.id).await.unwrap().len();

    let result = orders
        .create(
            user.id,
            OrderAmounts {
                subtotal: Decimal::new(1000, 2),
                discount: Decimal::ZERO,
                total: Decimal::new(1000, 2),
            },
            &[NewOrderItem {
                product_id,
                product_name: "Conta Streaming".to_string(),
                product_image: String::new(),
                price: Decimal::new(1000, 2),
                quantity: u32::MAX,
            }],
        )
        .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    assert_eq!(orders.list_for_user(user.id).await.unwrap().len(), before);
}
