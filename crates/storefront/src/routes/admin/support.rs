//! Support inbox.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use pixstore_core::TicketId;

use crate::db::SupportRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Message, Ticket, TicketSummary};
use crate::routes::support::{MessagesQuery, SendMessageRequest, post_message};
use crate::services::events::StoreEvent;
use crate::state::AppState;

async fn ticket(state: &AppState, id: TicketId) -> Result<Ticket> {
    SupportRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))
}

/// GET /api/admin/support/tickets
pub async fn tickets(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<TicketSummary>>> {
    Ok(Json(SupportRepository::new(state.pool()).list_all().await?))
}

/// GET /api/admin/support/tickets/{id}/messages
pub async fn messages(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<TicketId>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>> {
    let ticket = ticket(&state, id).await?;
    let messages = SupportRepository::new(state.pool())
        .messages(ticket.id, query.after)
        .await?;
    Ok(Json(messages))
}

/// POST /api/admin/support/tickets/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<TicketId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let ticket = ticket(&state, id).await?;
    post_message(&state, &ticket, &admin, &req).await
}

/// POST /api/admin/support/tickets/{id}/close
pub async fn close(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<TicketId>,
) -> Result<Json<Ticket>> {
    let ticket = SupportRepository::new(state.pool()).close(id).await?;

    tracing::info!(ticket_id = %id, admin_id = %admin.id, "ticket closed");
    state.events().publish(StoreEvent::TicketChanged {
        ticket_id: ticket.id,
        user_id: ticket.user_id,
        status: Some(ticket.status),
    });
    Ok(Json(ticket))
}

/// DELETE /api/admin/support/tickets/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<TicketId>,
) -> Result<StatusCode> {
    let ticket = ticket(&state, id).await?;
    SupportRepository::new(state.pool()).delete(id).await?;

    tracing::info!(ticket_id = %id, admin_id = %admin.id, "ticket deleted");
    state.events().publish(StoreEvent::TicketChanged {
        ticket_id: id,
        user_id: ticket.user_id,
        status: None,
    });
    Ok(StatusCode::NO_CONTENT)
}
