//! Credential pool repository.
//!
//! A row with `is_available = false` has been handed to an order and never
//! returns to the pool. The only path that flips the flag is
//! [`claim_credential`], which runs inside the fulfillment transaction.

use sqlx::{PgConnection, PgPool};

use pixstore_core::{OrderId, ProductId, StockItemId};

use super::RepositoryError;
use crate::models::StockItem;

const STOCK_COLUMNS: &str =
    "id, product_id, credential, is_available, assigned_order_id, created_at, assigned_at";

/// Repository for credential pool operations.
pub struct StockRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every credential of a product, available first, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockItem>, RepositoryError> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            r"
            SELECT {STOCK_COLUMNS}
            FROM product_stock
            WHERE product_id = $1
            ORDER BY is_available DESC, created_at, id
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Number of unassigned credentials for a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_count(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM product_stock WHERE product_id = $1 AND is_available",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Add credentials from pasted text, one per line.
    ///
    /// Lines are trimmed and blank lines dropped. Returns the number of rows
    /// inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no non-blank line remains, or
    /// `RepositoryError::NotFound` if the product does not exist.
    pub async fn import(&self, product_id: ProductId, raw: &str) -> Result<u64, RepositoryError> {
        let credentials = parse_credential_lines(raw);
        if credentials.is_empty() {
            return Err(RepositoryError::Conflict(
                "no credentials in input".to_string(),
            ));
        }

        let result = sqlx::query(
            r"
            INSERT INTO product_stock (product_id, credential)
            SELECT $1, c FROM UNNEST($2::text[]) AS c
            WHERE EXISTS (SELECT 1 FROM products WHERE id = $1)
            ",
        )
        .bind(product_id)
        .bind(&credentials)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(result.rows_affected())
    }

    /// Delete one credential that has not been assigned yet. Returns the
    /// product it belonged to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no available item has that id.
    pub async fn delete_available(&self, id: StockItemId) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar(
            "DELETE FROM product_stock WHERE id = $1 AND is_available RETURNING product_id",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete every unassigned credential of a product. Assigned rows stay
    /// as the delivery record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_available(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM product_stock WHERE product_id = $1 AND is_available")
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

/// Claim the oldest available credential of a product for an order.
///
/// Concurrent claimers skip rows another transaction has locked, so two
/// callers never receive the same credential. Returns `None` when the pool
/// is empty.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn claim_credential(
    conn: &mut PgConnection,
    product_id: ProductId,
    order_id: OrderId,
) -> Result<Option<String>, RepositoryError> {
    let credential: Option<String> = sqlx::query_scalar(
        r"
        UPDATE product_stock
        SET is_available = false, assigned_order_id = $2, assigned_at = NOW()
        WHERE id = (
            SELECT id FROM product_stock
            WHERE product_id = $1 AND is_available
            ORDER BY created_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING credential
        ",
    )
    .bind(product_id)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(credential)
}

/// Split pasted text into credentials: one per line, trimmed, blanks dropped.
#[must_use]
pub fn parse_credential_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credential_lines_trims_and_drops_blanks() {
        let raw = "  user1:pass1  \n\n\t\nuser2:pass2\r\n   ";
        assert_eq!(
            parse_credential_lines(raw),
            vec!["user1:pass1".to_string(), "user2:pass2".to_string()]
        );
    }

    #[test]
    fn test_parse_credential_lines_blank_input() {
        assert!(parse_credential_lines(" \n \n").is_empty());
        assert!(parse_credential_lines("").is_empty());
    }

    #[test]
    fn test_parse_credential_lines_keeps_inner_spaces() {
        assert_eq!(
            parse_credential_lines("key with spaces : value"),
            vec!["key with spaces : value".to_string()]
        );
    }
}
