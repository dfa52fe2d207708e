//! Product repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use pixstore_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

const PRODUCT_COLUMNS: &str = r"
    id, name, description, price, original_price, image, category, badge,
    rating, reviews_count, display_order, is_active, created_at, updated_at
";

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub image: String,
    pub category: String,
    pub badge: Option<String>,
    pub rating: Option<Decimal>,
    pub reviews_count: Option<i32>,
    pub is_active: bool,
}

/// Partial product update. `None` leaves a column unchanged; for the
/// nullable columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Option<Decimal>>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub badge: Option<Option<String>>,
    pub rating: Option<Decimal>,
    pub reviews_count: Option<i32>,
    pub is_active: Option<bool>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products in display order.
    ///
    /// The storefront passes `active_only = true`; the back-office sees
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        active_only: bool,
        category: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (is_active OR NOT $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY display_order, id
            "
        ))
        .bind(active_only)
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ProductId,
        active_only: bool,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND (is_active OR NOT $2)"
        ))
        .bind(id)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Active products among `ids`, for re-pricing a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) AND is_active"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Create a product at the end of the display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (
                name, description, price, original_price, image, category, badge,
                rating, reviews_count, is_active, display_order
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                COALESCE($8, 5.0), COALESCE($9, 0), $10,
                (SELECT COALESCE(MAX(display_order), 0) + 1 FROM products)
            )
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.original_price)
        .bind(&new.image)
        .bind(&new.category)
        .bind(new.badge.as_deref())
        .bind(new.rating)
        .bind(new.reviews_count)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                original_price = CASE WHEN $5 THEN $6 ELSE original_price END,
                image = COALESCE($7, image),
                category = COALESCE($8, category),
                badge = CASE WHEN $9 THEN $10 ELSE badge END,
                rating = COALESCE($11, rating),
                reviews_count = COALESCE($12, reviews_count),
                is_active = COALESCE($13, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.original_price.is_some())
        .bind(patch.original_price.flatten())
        .bind(patch.image.as_deref())
        .bind(patch.category.as_deref())
        .bind(patch.badge.is_some())
        .bind(patch.badge.clone().flatten())
        .bind(patch.rating)
        .bind(patch.reviews_count)
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Flip a product's visibility.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn toggle_active(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE products SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product and its credential pool. Order items keep their
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Assign `display_order` 1..n following the given id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn reorder(&self, ids: &[ProductId]) -> Result<(), RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        sqlx::query(
            r"
            UPDATE products p
            SET display_order = o.pos::int4, updated_at = NOW()
            FROM UNNEST($1::int4[]) WITH ORDINALITY AS o(id, pos)
            WHERE p.id = o.id
            ",
        )
        .bind(&raw)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
