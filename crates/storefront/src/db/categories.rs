//! Category repository.

use sqlx::PgPool;

use pixstore_core::CategoryId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::Category;

/// Icon used when a category is created without one.
pub const DEFAULT_ICON: &str = "Zap";

const SELECT_WITH_COUNT: &str = r"
    SELECT c.id, c.name, c.icon, c.display_order, c.is_active,
           (SELECT COUNT(*) FROM products p
            WHERE p.category = c.name AND p.is_active) AS product_count
    FROM categories c
";

/// Fields for creating or editing a category.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Categories in display order with their active product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_WITH_COUNT} WHERE c.is_active OR NOT $1 ORDER BY c.display_order, c.id"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Create a category at the end of the display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, icon, display_order, is_active)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(display_order), 0) + 1 FROM categories),
                $3
            )
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(input.icon.as_deref().unwrap_or(DEFAULT_ICON))
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_WITH_COUNT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(category)
    }

    /// Rename or restyle a category.
    ///
    /// Products reference categories by name, so a rename carries the
    /// products along in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist,
    /// `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let old_name = old_name.ok_or(RepositoryError::NotFound)?;
        let new_name = input.name.trim();

        sqlx::query(
            r"
            UPDATE categories
            SET name = $2,
                icon = COALESCE($3, icon),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(new_name)
        .bind(input.icon.as_deref())
        .bind(input.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?;

        if old_name != new_name {
            sqlx::query("UPDATE products SET category = $2, updated_at = NOW() WHERE category = $1")
                .bind(&old_name)
                .bind(new_name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products keep the old category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
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
    pub async fn reorder(&self, ids: &[CategoryId]) -> Result<(), RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(CategoryId::as_i32).collect();
        sqlx::query(
            r"
            UPDATE categories c
            SET display_order = o.pos::int4
            FROM UNNEST($1::int4[]) WITH ORDINALITY AS o(id, pos)
            WHERE c.id = o.id
            ",
        )
        .bind(&raw)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
