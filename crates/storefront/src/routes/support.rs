//! Customer support chat.
//!
//! Customers only ever see their own tickets; someone else's ticket is
//! reported as not found.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use pixstore_core::{MessageId, TicketId, TicketStatus};

use crate::db::SupportRepository;
use crate::db::support::NewMessage;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Message, Ticket, TicketSummary};
use crate::services::events::StoreEvent;
use crate::state::AppState;

const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;
const MAX_CLIENT_MESSAGE_ID_LENGTH: usize = 64;

/// New ticket request body.
#[derive(Debug, Deserialize)]
pub struct NewTicketRequest {
    pub subject: String,
    pub message: String,
}

/// Chat message request body.
///
/// `client_message_id` is generated by the client per message so a retried
/// send does not post twice.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub client_message_id: Option<String>,
}

/// Incremental fetch: only messages with a larger id.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub after: Option<MessageId>,
}

fn required_text<'t>(value: &'t str, field: &str, max: usize) -> Result<&'t str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} is limited to {max} characters"
        )));
    }
    Ok(value)
}

/// Store a chat message from `sender` and announce it.
///
/// Returns `201` for a new message and `200` when `client_message_id` was
/// already used on this ticket.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an empty or over-long message and
/// `AppError::Conflict` when the ticket is closed.
pub(crate) async fn post_message(
    state: &AppState,
    ticket: &Ticket,
    sender: &CurrentUser,
    req: &SendMessageRequest,
) -> Result<(StatusCode, Json<Message>)> {
    if ticket.status == TicketStatus::Closed {
        return Err(AppError::Conflict("ticket is closed".to_string()));
    }
    let text = required_text(&req.message, "message", MAX_MESSAGE_LENGTH)?;
    let client_message_id = req
        .client_message_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if client_message_id.is_some_and(|id| id.len() > MAX_CLIENT_MESSAGE_ID_LENGTH) {
        return Err(AppError::BadRequest("client_message_id is too long".to_string()));
    }

    let (message, inserted) = SupportRepository::new(state.pool())
        .add_message(
            ticket.id,
            &NewMessage {
                sender_id: sender.id,
                is_admin: sender.is_admin(),
                message: text,
                client_message_id,
            },
        )
        .await?;

    if !inserted {
        tracing::debug!(ticket_id = %ticket.id, "duplicate chat message ignored");
        return Ok((StatusCode::OK, Json(message)));
    }

    state.events().publish(StoreEvent::SupportMessage {
        user_id: ticket.user_id,
        message: message.clone(),
    });
    Ok((StatusCode::CREATED, Json(message)))
}

async fn own_ticket(state: &AppState, user: &CurrentUser, id: TicketId) -> Result<Ticket> {
    SupportRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|t| t.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))
}

/// GET /api/support/tickets
pub async fn tickets(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<TicketSummary>>> {
    let tickets = SupportRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(tickets))
}

/// POST /api/support/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<NewTicketRequest>,
) -> Result<impl IntoResponse> {
    let subject = required_text(&req.subject, "subject", MAX_SUBJECT_LENGTH)?;
    let message = required_text(&req.message, "message", MAX_MESSAGE_LENGTH)?;

    let (ticket, first) = SupportRepository::new(state.pool())
        .create_ticket(user.id, subject, message)
        .await?;

    tracing::info!(ticket_id = %ticket.id, user_id = %user.id, "support ticket opened");
    state.events().publish(StoreEvent::TicketChanged {
        ticket_id: ticket.id,
        user_id: ticket.user_id,
        status: Some(ticket.status),
    });
    state.events().publish(StoreEvent::SupportMessage {
        user_id: ticket.user_id,
        message: first,
    });

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/support/tickets/{id}/messages
pub async fn messages(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TicketId>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>> {
    let ticket = own_ticket(&state, &user, id).await?;
    let messages = SupportRepository::new(state.pool())
        .messages(ticket.id, query.after)
        .await?;
    Ok(Json(messages))
}

/// POST /api/support/tickets/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TicketId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let ticket = own_ticket(&state, &user, id).await?;
    post_message(&state, &ticket, &user, &req).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("  oi  ", "message", 10).unwrap(), "oi");
    }

    #[test]
    fn test_required_text_rejects_blank() {
        assert!(required_text("   ", "subject", 10).is_err());
    }

    #[test]
    fn test_required_text_counts_chars() {
        assert!(required_text("ááá", "message", 3).is_ok());
        assert!(required_text("áááá", "message", 3).is_err());
    }
}
