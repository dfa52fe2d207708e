//! Order management.
//!
//! Moving a pending order to any paid status goes through the same
//! fulfillment path as a confirmed PIX payment, so credentials are
//! delivered exactly once no matter who confirms first. Digital goods
//! ship on confirmation, so such an order ends up `delivered`.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use pixstore_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{AdminOrder, Order};
use crate::services::events::StoreEvent;
use crate::services::fulfillment::fulfill;
use crate::state::AppState;

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Deliverable override body.
#[derive(Debug, Deserialize)]
pub struct DeliverableRequest {
    pub deliverable: String,
}

fn publish(state: &AppState, order: &Order) {
    state.events().publish(StoreEvent::OrderChanged {
        order_id: order.id,
        user_id: order.user_id,
        status: order.status,
    });
}

/// GET /api/admin/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<AdminOrder>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_all().await?))
}

/// PATCH /api/admin/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let orders = OrderRepository::new(state.pool());
    let current = orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let order = if current.status == OrderStatus::Pending && req.status.is_paid() {
        let fulfillment = fulfill(state.pool(), state.events(), id).await?;
        fulfillment.order
    } else {
        let order = orders.update_status(id, req.status).await?;
        publish(&state, &order);
        order
    };

    tracing::info!(
        order_id = %id,
        admin_id = %admin.id,
        from = %current.status,
        to = %order.status,
        "order status changed by admin"
    );
    Ok(Json(order))
}

/// PUT /api/admin/orders/{id}/deliverable
pub async fn set_deliverable(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<DeliverableRequest>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .set_deliverable(id, req.deliverable.trim())
        .await?;

    tracing::info!(order_id = %id, admin_id = %admin.id, "deliverable replaced");
    publish(&state, &order);
    Ok(Json(order))
}
