//! Category management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use pixstore_core::CategoryId;

use super::ReorderRequest;
use crate::db::CategoryRepository;
use crate::db::categories::CategoryInput;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 60;

/// Create/update body.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

impl CategoryRequest {
    fn validate(self) -> Result<CategoryInput> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::BadRequest(format!(
                "name is limited to {MAX_NAME_LENGTH} characters"
            )));
        }
        Ok(CategoryInput {
            name: name.to_string(),
            icon: self
                .icon
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty()),
            is_active: self.is_active,
        })
    }
}

/// GET /api/admin/categories
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list(false).await?))
}

/// POST /api/admin/categories
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse> {
    let category = CategoryRepository::new(state.pool())
        .create(&req.validate()?)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/admin/categories/{id}
///
/// Renaming moves the category's products along.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.pool())
        .update(id, &req.validate()?)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/admin/categories/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    tracing::info!(category_id = %id, admin_id = %admin.id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/categories/reorder
pub async fn reorder(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<ReorderRequest<CategoryId>>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).reorder(&req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_icon_falls_back() {
        let input = CategoryRequest {
            name: " Streaming ".to_string(),
            icon: Some("  ".to_string()),
            is_active: None,
        }
        .validate()
        .unwrap();
        assert_eq!(input.name, "Streaming");
        assert!(input.icon.is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let req = CategoryRequest {
            name: String::new(),
            icon: None,
            is_active: None,
        };
        assert!(req.validate().is_err());
    }
}
