//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pixstore_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

/// An order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// Amount charged through PIX
    pub total: Decimal,
    #[serde(skip_serializing)]
    pub pix_transaction_id: Option<String>,
    pub pix_qrcode: Option<String>,
    pub pix_expires_at: Option<DateTime<Utc>>,
    pub deliverable: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether the payment window has closed on a still-pending order.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending && self.pix_expires_at.is_some_and(|at| at <= now)
    }
}

/// Snapshot of a product at the moment the order was placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_image: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// An order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Back-office order row with the customer's contact data.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: OrderWithItems,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn order(status: OrderStatus, expires_in_minutes: Option<i64>) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            status,
            subtotal: Decimal::new(5980, 2),
            discount: Decimal::new(299, 2),
            total: Decimal::new(5681, 2),
            pix_transaction_id: Some("tx-1".to_string()),
            pix_qrcode: Some("000201...".to_string()),
            pix_expires_at: expires_in_minutes.map(|m| now + Duration::minutes(m)),
            deliverable: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        }
    }

    #[test]
    fn test_pending_order_past_window_is_expired() {
        assert!(order(OrderStatus::Pending, Some(-1)).is_expired(Utc::now()));
        assert!(!order(OrderStatus::Pending, Some(10)).is_expired(Utc::now()));
    }

    #[test]
    fn test_paid_order_never_expires() {
        assert!(!order(OrderStatus::Delivered, Some(-60)).is_expired(Utc::now()));
    }

    #[test]
    fn test_order_without_charge_never_expires() {
        assert!(!order(OrderStatus::Pending, None).is_expired(Utc::now()));
    }

    #[test]
    fn test_transaction_id_not_serialized() {
        let json = serde_json::to_value(order(OrderStatus::Pending, Some(5))).unwrap_or_default();
        assert!(json.get("pix_transaction_id").is_none());
        assert_eq!(json["status"], "pending");
    }
}
