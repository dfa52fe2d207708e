//! Store settings database operations.
//!
//! The `store_settings` table is a plain key/value store. Typed access goes
//! through [`StoreSettings`], cached in `AppState`.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::StoreSettings;

/// Load every stored setting into the typed view.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_settings(pool: &PgPool) -> Result<StoreSettings, RepositoryError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM store_settings")
        .fetch_all(pool)
        .await?;

    Ok(StoreSettings::from_pairs(
        rows.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    ))
}

/// Upsert a single setting.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_setting(pool: &PgPool, key: &str, value: &str) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO store_settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store every field of `settings` in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any upsert fails.
pub async fn save_settings(pool: &PgPool, settings: &StoreSettings) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;
    for (key, value) in settings.to_pairs() {
        sqlx::query(
            r"
            INSERT INTO store_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(&value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
