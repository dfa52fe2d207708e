//! Customer listing.

use axum::{Json, extract::State};

use crate::db::UserRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::AdminUserSummary;
use crate::state::AppState;

/// GET /api/admin/users
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<AdminUserSummary>>> {
    Ok(Json(UserRepository::new(state.pool()).list_with_stats().await?))
}
