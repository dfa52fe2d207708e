//! Dashboard metrics.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db::dashboard::{orders_between, signups_between};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::dashboard::{Dashboard, Period, summarize};
use crate::state::AppState;

/// `?period=today|week|month|custom&start=YYYY-MM-DD&end=YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// GET /api/admin/dashboard
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>> {
    let period = Period::from_query(query.period.as_deref(), query.start, query.end)
        .map_err(AppError::BadRequest)?;
    let range = period.range(Utc::now());

    let orders = orders_between(state.pool(), range.start, range.end).await?;
    let signups = signups_between(state.pool(), range.start, range.end).await?;

    Ok(Json(summarize(&orders, &signups, range)))
}
