//! Raw rows for the back-office dashboard.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{OrderRepository, RepositoryError};
use crate::models::Order;

/// Orders created in `[start, end)`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn orders_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Order>, RepositoryError> {
    OrderRepository::new(pool).list_created_between(start, end).await
}

/// Creation times of customer profiles in `[start, end)`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn signups_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
    let signups: Vec<DateTime<Utc>> = sqlx::query_scalar(
        r"
        SELECT created_at FROM profiles
        WHERE created_at >= $1 AND created_at < $2
        ORDER BY created_at
        ",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(signups)
}
