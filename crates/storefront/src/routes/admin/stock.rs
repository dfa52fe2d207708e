//! Credential pool management and manual assignment.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use pixstore_core::{OrderId, ProductId, StockItemId};

use crate::db::{OrderRepository, ProductRepository, StockRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::StockItem;
use crate::services::fulfillment::{
    AssignResult, assign as assign_credential, publish_stock_levels,
};
use crate::state::AppState;

/// Bulk import body: one credential per line.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub credentials: String,
}

/// Manual assignment body.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub product_id: ProductId,
    pub order_id: OrderId,
}

/// Pool contents with counts.
#[derive(Debug, Serialize)]
pub struct StockPool {
    pub product_id: ProductId,
    pub available: usize,
    pub sold: usize,
    pub items: Vec<StockItem>,
}

/// Result of a bulk change.
#[derive(Debug, Serialize)]
pub struct StockChange {
    pub product_id: ProductId,
    pub count: u64,
}

/// GET /api/admin/products/{id}/stock
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(product_id): Path<ProductId>,
) -> Result<Json<StockPool>> {
    let items = StockRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;
    let available = items.iter().filter(|i| i.is_available).count();
    Ok(Json(StockPool {
        product_id,
        available,
        sold: items.len() - available,
        items,
    }))
}

/// POST /api/admin/products/{id}/stock
pub async fn import(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    Json(req): Json<ImportRequest>,
) -> Result<(StatusCode, Json<StockChange>)> {
    let count = StockRepository::new(state.pool())
        .import(product_id, &req.credentials)
        .await?;

    tracing::info!(%product_id, admin_id = %admin.id, count, "stock imported");
    publish_stock_levels(state.pool(), state.events(), [product_id]).await;
    Ok((StatusCode::CREATED, Json(StockChange { product_id, count })))
}

/// DELETE /api/admin/products/{id}/stock
///
/// Sold credentials stay, they are part of order history.
pub async fn clear(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
) -> Result<Json<StockChange>> {
    let count = StockRepository::new(state.pool())
        .clear_available(product_id)
        .await?;

    tracing::info!(%product_id, admin_id = %admin.id, count, "unsold stock cleared");
    publish_stock_levels(state.pool(), state.events(), [product_id]).await;
    Ok(Json(StockChange { product_id, count }))
}

/// DELETE /api/admin/stock/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<StockItemId>,
) -> Result<StatusCode> {
    let product_id = StockRepository::new(state.pool())
        .delete_available(id)
        .await?;
    publish_stock_levels(state.pool(), state.events(), [product_id]).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/stock/assign
///
/// An empty pool is not an HTTP error: the body carries
/// `{"credential": null, "error": "No stock available"}`.
pub async fn assign(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<AssignRequest>,
) -> Result<Json<AssignResult>> {
    ProductRepository::new(state.pool())
        .get(req.product_id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", req.product_id)))?;
    OrderRepository::new(state.pool())
        .get(req.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", req.order_id)))?;

    let result =
        assign_credential(state.pool(), state.events(), req.product_id, req.order_id).await?;
    Ok(Json(result))
}
