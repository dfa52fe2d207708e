//! Catalog types: categories, products and stock items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pixstore_core::{CategoryId, OrderId, ProductId, StockItemId, discount_percent};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: String,
    pub display_order: i32,
    pub is_active: bool,
    /// Active products whose `category` equals this category's name.
    pub product_count: i64,
}

/// A product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub image: String,
    pub category: String,
    pub badge: Option<String>,
    pub rating: Decimal,
    pub reviews_count: i32,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Savings badge percentage, when the product is on sale.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        discount_percent(self.price, self.original_price)
    }
}

/// One credential in a product's pool.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockItem {
    pub id: StockItemId,
    pub product_id: ProductId,
    pub credential: String,
    pub is_available: bool,
    pub assigned_order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}
