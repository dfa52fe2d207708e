//! Product management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use pixstore_core::ProductId;

use super::ReorderRequest;
use crate::db::ProductRepository;
use crate::db::products::{NewProduct, ProductPatch};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::routes::catalog::ProductView;
use crate::state::AppState;

/// New product body.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub badge: Option<String>,
    pub rating: Option<Decimal>,
    pub reviews_count: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial update body. For `original_price` and `badge`, an explicit
/// `null` clears the value while an absent field leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "present")]
    pub original_price: Option<Option<Decimal>>,
    pub image: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub badge: Option<Option<String>>,
    pub rating: Option<Decimal>,
    pub reviews_count: Option<i32>,
    pub is_active: Option<bool>,
}

/// Distinguish `"field": null` from a missing field.
fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest("price must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_rating(rating: Option<Decimal>) -> Result<()> {
    if rating.is_some_and(|r| r < Decimal::ZERO || r > Decimal::from(5)) {
        return Err(AppError::BadRequest("rating must be between 0 and 5".to_string()));
    }
    Ok(())
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl CreateProductRequest {
    fn validate(self) -> Result<NewProduct> {
        validate_price(self.price)?;
        validate_rating(self.rating)?;
        Ok(NewProduct {
            name: non_empty(&self.name, "name")?,
            description: self.description.trim().to_string(),
            price: self.price,
            original_price: self.original_price,
            image: self.image.trim().to_string(),
            category: non_empty(&self.category, "category")?,
            badge: self.badge.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
            rating: self.rating,
            reviews_count: self.reviews_count.map(|c| c.max(0)),
            is_active: self.is_active,
        })
    }
}

impl UpdateProductRequest {
    fn validate(self) -> Result<ProductPatch> {
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        validate_rating(self.rating)?;
        Ok(ProductPatch {
            name: self.name.as_deref().map(|n| non_empty(n, "name")).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            price: self.price,
            original_price: self.original_price,
            image: self.image.map(|i| i.trim().to_string()),
            category: self
                .category
                .as_deref()
                .map(|c| non_empty(c, "category"))
                .transpose()?,
            badge: self
                .badge
                .map(|b| b.map(|b| b.trim().to_string()).filter(|b| !b.is_empty())),
            rating: self.rating,
            reviews_count: self.reviews_count.map(|c| c.max(0)),
            is_active: self.is_active,
        })
    }
}

/// GET /api/admin/products
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list(false, None).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// POST /api/admin/products
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .create(&req.validate()?)
        .await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "product created");
    Ok((StatusCode::CREATED, Json(ProductView::from(product))))
}

/// PATCH /api/admin/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .update(id, &req.validate()?)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /api/admin/products/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/products/{id}/toggle
pub async fn toggle(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool()).toggle_active(id).await?;
    Ok(Json(product))
}

/// POST /api/admin/products/reorder
pub async fn reorder(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(req): Json<ReorderRequest<ProductId>>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).reorder(&req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
