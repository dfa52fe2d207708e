//! Order repository.
//!
//! Status changes go through guarded updates so concurrent confirmation
//! paths cannot move an order backwards or deliver it twice.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use pixstore_core::{OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{AdminOrder, Order, OrderItem, OrderWithItems};

const ORDER_COLUMNS: &str = r"
    id, user_id, status, subtotal, discount, total, pix_transaction_id,
    pix_qrcode, pix_expires_at, deliverable, created_at, updated_at, paid_at
";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_image, price, quantity";

/// Item snapshot for a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Amounts for a new order.
#[derive(Debug, Clone, Copy)]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: Order,
    customer_email: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending order with its item snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a quantity that does not fit
    /// the column, or `RepositoryError::Database` if either insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        amounts: OrderAmounts,
        items: &[NewOrderItem],
    ) -> Result<OrderWithItems, RepositoryError> {
        let quantities = items
            .iter()
            .map(|i| {
                i32::try_from(i.quantity).map_err(|_| {
                    RepositoryError::Conflict(format!("quantity {} is out of range", i.quantity))
                })
            })
            .collect::<Result<Vec<i32>, _>>()?;

        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (user_id, status, subtotal, discount, total)
            VALUES ($1, 'pending', $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(amounts.subtotal)
        .bind(amounts.discount)
        .bind(amounts.total)
        .fetch_one(&mut *tx)
        .await?;

        let product_ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
        let names: Vec<&str> = items.iter().map(|i| i.product_name.as_str()).collect();
        let images: Vec<&str> = items.iter().map(|i| i.product_image.as_str()).collect();
        let prices: Vec<Decimal> = items.iter().map(|i| i.price).collect();

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            r"
            INSERT INTO order_items (order_id, product_id, product_name, product_image, price, quantity)
            SELECT $1, * FROM UNNEST($2::int4[], $3::text[], $4::text[], $5::numeric[], $6::int4[])
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(order.id)
        .bind(&product_ids)
        .bind(&names)
        .bind(&images)
        .bind(&prices)
        .bind(&quantities)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(OrderWithItems { order, items })
    }

    /// Store the PIX charge for a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn attach_charge(
        &self,
        id: OrderId,
        transaction_id: &str,
        qrcode: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET pix_transaction_id = $2, pix_qrcode = $3, pix_expires_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(transaction_id)
        .bind(qrcode)
        .bind(expires_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order =
            sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(order)
    }

    /// Get an order with items, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };
        let items = self.items_for(&[order.id]).await?.remove(&order.id);
        Ok(Some(OrderWithItems {
            order,
            items: items.unwrap_or_default(),
        }))
    }

    /// A customer's orders with items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    /// Every order with items and customer contact data, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminOrderRow>(
            r"
            SELECT
                o.id, o.user_id, o.status, o.subtotal, o.discount, o.total,
                o.pix_transaction_id, o.pix_qrcode, o.pix_expires_at, o.deliverable,
                o.created_at, o.updated_at, o.paid_at,
                u.email AS customer_email,
                p.display_name AS customer_name,
                p.phone AS customer_phone
            FROM orders o
            JOIN users u ON u.id = o.user_id
            LEFT JOIN profiles p ON p.user_id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
        let mut items = self.items_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| AdminOrder {
                order: OrderWithItems {
                    items: items.remove(&row.order.id).unwrap_or_default(),
                    order: row.order,
                },
                customer_email: row.customer_email,
                customer_name: row.customer_name,
                customer_phone: row.customer_phone,
            })
            .collect())
    }

    async fn items_for(
        &self,
        ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = ids.iter().map(OrderId::as_i32).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    /// Overwrite the delivered text, for manual corrections by an admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_deliverable(
        &self,
        id: OrderId,
        deliverable: &str,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET deliverable = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(deliverable)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Move an order to `next` if the transition rules allow it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move order from {current} to {next}"
            )));
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET status = $2,
                paid_at = CASE WHEN $3 THEN COALESCE(paid_at, NOW()) ELSE paid_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(next)
        .bind(next.is_paid())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Cancel an order that is still pending. Returns `None` when the order
    /// had already moved on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel_if_pending(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Pending orders that have a PIX charge to verify.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_pending_with_charge(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE status = 'pending' AND pix_transaction_id IS NOT NULL
            ORDER BY id
            "
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Orders created in `[start, end)`, for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at
            "
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }
}

/// Approve a pending order, stamping `paid_at`.
///
/// Returns `None` when the order was not pending, which tells the caller a
/// concurrent confirmation already won.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_approved_if_pending(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET status = 'approved', paid_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

/// Items of an order, read on the fulfillment connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Store the deliverable and mark the order delivered.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_delivered(
    conn: &mut PgConnection,
    id: OrderId,
    deliverable: &str,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET status = 'delivered', deliverable = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(deliverable)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}
