//! Checkout, order history and payment status.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tower_sessions::Session;

use pixstore_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::OrderWithItems;
use crate::routes::cart::{load_cart, save_cart};
use crate::services::checkout::{CheckoutService, PaymentStatus};
use crate::state::AppState;

fn checkout_service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(
        state.pool(),
        state.pix(),
        state.events(),
        state.config().pix.payment_window,
    )
}

/// POST /api/checkout
///
/// Turns the session cart into a pending order with a PIX charge. The cart
/// is emptied only once the charge exists.
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await?;
    let settings = state.settings().await?;

    let order = checkout_service(&state)
        .checkout(&user, &cart, settings)
        .await?;

    cart.clear();
    save_cart(&session, &cart).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    Ok(Json(order))
}

/// GET /api/orders/{id}/payment
///
/// Polled by the payment page until the PIX status is terminal.
pub async fn payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<PaymentStatus>> {
    let status = checkout_service(&state).payment_status(&user, id).await?;
    Ok(Json(status))
}
