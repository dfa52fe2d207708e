//! Checkout and payment status.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use pixstore_core::{Cart, CartLine, OrderId, OrderStatus, PixStatus, ProductId};

use crate::db::orders::{NewOrderItem, OrderAmounts};
use crate::db::{OrderRepository, ProductRepository, RepositoryError, StockRepository};
use crate::models::{CurrentUser, Order, OrderWithItems, Product, StoreSettings};
use crate::services::events::{EventBus, StoreEvent};
use crate::services::fulfillment::fulfill;
use crate::services::pix::{PixClient, PixError};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line refers to a product that is gone or hidden.
    #[error("product is no longer available: {0}")]
    ProductUnavailable(String),

    #[error("minimum order value is {minimum}, cart subtotal is {subtotal}")]
    BelowMinimum { minimum: Decimal, subtotal: Decimal },

    #[error("only {available} unit(s) of {product} in stock")]
    InsufficientStock { product: String, available: i64 },

    #[error("order not found")]
    OrderNotFound,

    #[error("payment provider error: {0}")]
    Pix(#[from] PixError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome of a payment status check.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatus {
    pub pix_status: PixStatus,
    pub order: Order,
}

/// Checkout and payment status service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    pix: &'a PixClient,
    events: &'a EventBus,
    payment_window: Duration,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        pix: &'a PixClient,
        events: &'a EventBus,
        payment_window: Duration,
    ) -> Self {
        Self {
            pool,
            pix,
            events,
            payment_window,
        }
    }

    /// Turn the cart into a pending order with a PIX charge.
    ///
    /// Every line is re-priced from the catalog first. If the provider
    /// cannot generate a charge the order is cancelled.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of `CheckoutError` when the cart cannot
    /// be ordered, or `CheckoutError::Pix` when charge generation failed.
    #[instrument(skip(self, user, cart, settings), fields(user_id = %user.id))]
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        settings: StoreSettings,
    ) -> Result<OrderWithItems, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let ids: Vec<ProductId> = cart.lines.iter().map(|l| l.product_id).collect();
        let catalog: HashMap<ProductId, Product> = ProductRepository::new(self.pool)
            .get_active_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let priced = reprice(cart, &catalog)?;
        let totals = priced.totals(settings.minimum_order_value, settings.pix_discount_percent);
        if !totals.meets_minimum {
            return Err(CheckoutError::BelowMinimum {
                minimum: totals.minimum_order_value,
                subtotal: totals.subtotal,
            });
        }

        let stock = StockRepository::new(self.pool);
        for line in &priced.lines {
            let available = stock.available_count(line.product_id).await?;
            if available < i64::from(line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product: line.name.clone(),
                    available,
                });
            }
        }

        let items: Vec<NewOrderItem> = priced
            .lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                product_name: line.name.clone(),
                product_image: line.image.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();

        let orders = OrderRepository::new(self.pool);
        let created = orders
            .create(
                user.id,
                OrderAmounts {
                    subtotal: totals.subtotal,
                    discount: totals.discount,
                    total: totals.pix_total,
                },
                &items,
            )
            .await?;
        let order_id = created.order.id;

        let charge = match self.pix.generate(totals.pix_total).await {
            Ok(charge) => charge,
            Err(e) => {
                tracing::error!(%order_id, error = %e, "pix charge generation failed, cancelling order");
                if let Some(cancelled) = orders.cancel_if_pending(order_id).await? {
                    self.publish_order(&cancelled);
                }
                return Err(e.into());
            }
        };

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.payment_window)
                .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let order = orders
            .attach_charge(order_id, &charge.transaction_id, &charge.qrcode, expires_at)
            .await?;

        tracing::info!(%order_id, total = %order.total, "order created");
        self.publish_order(&order);

        Ok(OrderWithItems {
            order,
            items: created.items,
        })
    }

    /// Check a customer's order against the provider and act on the answer.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` if the order does not exist or
    /// belongs to someone else.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn payment_status(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
    ) -> Result<PaymentStatus, CheckoutError> {
        let order = OrderRepository::new(self.pool)
            .get_for_user(order_id, user.id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?
            .order;

        self.reconcile(order).await
    }

    /// Bring a single order in line with the provider.
    ///
    /// Orders that already left `pending` are answered from the database.
    /// A pending order is always verified before anything else happens to
    /// it, so a payment made just before the window closed is still
    /// delivered. Only an expired order the provider still reports as
    /// unpaid is cancelled. A provider failure leaves the order untouched
    /// and reports it as pending.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if a database update fails.
    pub async fn reconcile(&self, order: Order) -> Result<PaymentStatus, CheckoutError> {
        if order.status != OrderStatus::Pending {
            return Ok(PaymentStatus {
                pix_status: settled_pix_status(order.status),
                order,
            });
        }

        let Some(transaction_id) = order.pix_transaction_id.clone() else {
            return Ok(PaymentStatus {
                pix_status: PixStatus::Pending,
                order,
            });
        };

        let pix_status = match self.pix.verify(&transaction_id, order.total).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "pix verification failed");
                return Ok(PaymentStatus {
                    pix_status: PixStatus::Pending,
                    order,
                });
            }
        };

        match pix_status {
            PixStatus::Completed => {
                let order = fulfill(self.pool, self.events, order.id).await?.order;
                Ok(PaymentStatus { pix_status, order })
            }
            PixStatus::Failed => {
                let order = self.cancel(order).await?;
                Ok(PaymentStatus { pix_status, order })
            }
            PixStatus::Pending if order.is_expired(Utc::now()) => {
                tracing::info!(order_id = %order.id, "payment window closed unpaid, cancelling");
                let order = self.cancel(order).await?;
                Ok(PaymentStatus {
                    pix_status: settled_pix_status(order.status),
                    order,
                })
            }
            PixStatus::Pending | PixStatus::Retido => Ok(PaymentStatus { pix_status, order }),
        }
    }

    async fn cancel(&self, order: Order) -> Result<Order, RepositoryError> {
        let orders = OrderRepository::new(self.pool);
        if let Some(cancelled) = orders.cancel_if_pending(order.id).await? {
            self.publish_order(&cancelled);
            return Ok(cancelled);
        }
        // Someone else moved it first; report what is stored now.
        Ok(orders.get(order.id).await?.unwrap_or(order))
    }

    fn publish_order(&self, order: &Order) {
        self.events.publish(StoreEvent::OrderChanged {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
        });
    }
}

/// PIX status implied by an order that is no longer pending.
#[must_use]
pub const fn settled_pix_status(status: OrderStatus) -> PixStatus {
    match status {
        OrderStatus::Pending => PixStatus::Pending,
        OrderStatus::Cancelled => PixStatus::Failed,
        OrderStatus::Approved
        | OrderStatus::Processing
        | OrderStatus::Shipped
        | OrderStatus::Delivered => PixStatus::Completed,
    }
}

/// Rebuild the cart from current catalog prices, names and images.
///
/// # Errors
///
/// Returns `CheckoutError::ProductUnavailable` for the first line whose
/// product is missing or inactive.
pub fn reprice(cart: &Cart, catalog: &HashMap<ProductId, Product>) -> Result<Cart, CheckoutError> {
    let mut priced = Cart::new();
    for line in &cart.lines {
        let product = catalog
            .get(&line.product_id)
            .ok_or_else(|| CheckoutError::ProductUnavailable(line.name.clone()))?;
        priced.add(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            quantity: line.quantity,
        });
    }
    Ok(priced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Current {id}"),
            description: String::new(),
            price: Decimal::new(price_cents, 2),
            original_price: None,
            image: format!("https://img.example/{id}.png"),
            category: "Streaming".to_string(),
            badge: None,
            rating: Decimal::new(50, 1),
            reviews_count: 0,
            display_order: id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn stale_line(id: i32, price_cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Old {id}"),
            image: String::new(),
            price: Decimal::new(price_cents, 2),
            quantity,
        }
    }

    #[test]
    fn test_reprice_uses_catalog_prices() {
        let mut cart = Cart::new();
        cart.add(stale_line(1, 1000, 2));
        let catalog = HashMap::from([(ProductId::new(1), product(1, 2990))]);

        let priced = reprice(&cart, &catalog).unwrap();
        assert_eq!(priced.lines[0].price, Decimal::new(2990, 2));
        assert_eq!(priced.lines[0].name, "Current 1");
        assert_eq!(priced.subtotal(), Decimal::new(5980, 2));
    }

    #[test]
    fn test_reprice_rejects_missing_product() {
        let mut cart = Cart::new();
        cart.add(stale_line(1, 1000, 1));
        cart.add(stale_line(2, 1000, 1));
        let catalog = HashMap::from([(ProductId::new(1), product(1, 1000))]);

        let err = reprice(&cart, &catalog).unwrap_err();
        assert!(matches!(err, CheckoutError::ProductUnavailable(name) if name == "Old 2"));
    }

    #[test]
    fn test_settled_pix_status() {
        assert_eq!(settled_pix_status(OrderStatus::Delivered), PixStatus::Completed);
        assert_eq!(settled_pix_status(OrderStatus::Approved), PixStatus::Completed);
        assert_eq!(settled_pix_status(OrderStatus::Cancelled), PixStatus::Failed);
    }
}
