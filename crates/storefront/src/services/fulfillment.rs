//! Payment confirmation and credential delivery.
//!
//! Customer polling, the payment watcher and the admin status override all
//! confirm payments through [`fulfill`]. The guarded `pending -> approved`
//! update lets exactly one caller win; the rest see the order as it stands.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use pixstore_core::{
    DeliverableLine, OUT_OF_STOCK_PLACEHOLDER, OrderId, ProductId, format_deliverable,
};

use crate::db::orders::{items_for_order, mark_approved_if_pending, mark_delivered};
use crate::db::stock::claim_credential;
use crate::db::{OrderRepository, RepositoryError, StockRepository};
use crate::models::Order;
use crate::services::events::{EventBus, StoreEvent};

/// Result of a [`fulfill`] call.
#[derive(Debug, Clone)]
pub struct Fulfillment {
    pub order: Order,
    /// `false` when another confirmation path had already handled the order.
    pub delivered_now: bool,
}

/// Result of a single stock assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignResult {
    pub credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Confirm payment for an order and deliver one credential per unit.
///
/// Idempotent: calling it on an order that is no longer pending returns the
/// current order with `delivered_now = false` and claims nothing.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist, or
/// `RepositoryError::Database` if the transaction fails (nothing is claimed
/// in that case).
#[instrument(skip(pool, events))]
pub async fn fulfill(
    pool: &PgPool,
    events: &EventBus,
    order_id: OrderId,
) -> Result<Fulfillment, RepositoryError> {
    let mut tx = pool.begin().await?;

    let Some(approved) = mark_approved_if_pending(&mut *tx, order_id).await? else {
        tx.rollback().await?;
        let order = OrderRepository::new(pool)
            .get(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tracing::debug!(status = %order.status, "order already confirmed elsewhere");
        return Ok(Fulfillment {
            order,
            delivered_now: false,
        });
    };

    let items = items_for_order(&mut *tx, order_id).await?;
    let mut lines = Vec::new();
    let mut touched: BTreeSet<ProductId> = BTreeSet::new();

    for item in &items {
        for _ in 0..item.quantity.max(0) {
            let credential = match item.product_id {
                Some(product_id) => {
                    touched.insert(product_id);
                    claim_credential(&mut *tx, product_id, order_id).await?
                }
                None => None,
            };
            let credential = credential.unwrap_or_else(|| {
                tracing::warn!(
                    product = %item.product_name,
                    product_id = ?item.product_id,
                    "stock pool empty, delivering placeholder"
                );
                OUT_OF_STOCK_PLACEHOLDER.to_string()
            });
            lines.push(DeliverableLine::new(&item.product_name, credential));
        }
    }

    let order = mark_delivered(&mut *tx, order_id, &format_deliverable(&lines)).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %approved.user_id,
        units = lines.len(),
        placeholders = lines.iter().filter(|l| l.is_placeholder()).count(),
        "order delivered"
    );

    events.publish(StoreEvent::OrderChanged {
        order_id,
        user_id: order.user_id,
        status: order.status,
    });
    publish_stock_levels(pool, events, touched).await;

    Ok(Fulfillment {
        order,
        delivered_now: true,
    })
}

/// Claim one credential of `product_id` for `order_id`.
///
/// An empty pool is reported in `error` rather than as a failure.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the claim transaction fails.
#[instrument(skip(pool, events))]
pub async fn assign(
    pool: &PgPool,
    events: &EventBus,
    product_id: ProductId,
    order_id: OrderId,
) -> Result<AssignResult, RepositoryError> {
    let mut tx = pool.begin().await?;
    let credential = claim_credential(&mut *tx, product_id, order_id).await?;
    tx.commit().await?;

    if credential.is_none() {
        tracing::warn!("no stock available");
        return Ok(AssignResult {
            credential: None,
            error: Some("No stock available".to_string()),
        });
    }

    publish_stock_levels(pool, events, [product_id]).await;
    Ok(AssignResult {
        credential,
        error: None,
    })
}

/// Broadcast the new available counts. Failures only cost a stale badge.
pub async fn publish_stock_levels(
    pool: &PgPool,
    events: &EventBus,
    products: impl IntoIterator<Item = ProductId>,
) {
    let stock = StockRepository::new(pool);
    for product_id in products {
        match stock.available_count(product_id).await {
            Ok(available) => events.publish(StoreEvent::StockChanged {
                product_id,
                available,
            }),
            Err(e) => tracing::warn!(%product_id, error = %e, "failed to read stock level"),
        }
    }
}
