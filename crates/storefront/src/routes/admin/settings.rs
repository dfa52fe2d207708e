//! Store settings.

use axum::{Json, extract::State};
use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::StoreSettings;
use crate::state::AppState;

fn validate(settings: &StoreSettings) -> Result<()> {
    if settings.minimum_order_value < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "minimum order value cannot be negative".to_string(),
        ));
    }
    if settings.pix_discount_percent < Decimal::ZERO
        || settings.pix_discount_percent > Decimal::ONE_HUNDRED
    {
        return Err(AppError::BadRequest(
            "PIX discount must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/admin/settings
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<StoreSettings>> {
    Ok(Json(state.settings().await?))
}

/// PUT /api/admin/settings
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(settings): Json<StoreSettings>,
) -> Result<Json<StoreSettings>> {
    validate(&settings)?;
    state.set_settings(settings).await?;

    tracing::info!(
        admin_id = %admin.id,
        minimum_order_value = %settings.minimum_order_value,
        pix_discount_percent = %settings.pix_discount_percent,
        "store settings updated"
    );
    Ok(Json(settings))
}
