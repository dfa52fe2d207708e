//! Public catalog: categories, products, stock levels and store settings.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use pixstore_core::ProductId;

use crate::db::{CategoryRepository, ProductRepository, StockRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, Product, StoreSettings};
use crate::state::AppState;

/// Product listing filters.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

/// Available units of a product.
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub available: i64,
}

/// A product with its derived discount badge.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discount_percent: Option<u32>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            discount_percent: product.discount_percent(),
            product,
        }
    }
}

/// GET /api/categories
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list(true).await?;
    Ok(Json(categories))
}

/// GET /api/products
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let products = ProductRepository::new(state.pool())
        .list(true, category)
        .await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// GET /api/products/{id}
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get(id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product.into()))
}

/// GET /api/products/{id}/stock
pub async fn product_stock(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<StockLevel>> {
    let available = StockRepository::new(state.pool()).available_count(id).await?;
    Ok(Json(StockLevel {
        product_id: id,
        available,
    }))
}

/// GET /api/settings
pub async fn settings(State(state): State<AppState>) -> Result<Json<StoreSettings>> {
    Ok(Json(state.settings().await?))
}
