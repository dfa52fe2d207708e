//! Support ticket and chat message types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pixstore_core::{MessageId, TicketId, TicketStatus, UserId};

/// A support ticket.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: TicketId,
    pub user_id: UserId,
    pub subject: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ticket list entry with the customer's name and the latest message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TicketSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: Ticket,
    pub user_name: String,
    pub user_email: String,
    pub last_message: Option<String>,
}

/// One chat message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub ticket_id: TicketId,
    pub sender_id: UserId,
    pub is_admin: bool,
    pub message: String,
    pub client_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
