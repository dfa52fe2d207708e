//! Support ticket and chat repository.

use sqlx::PgPool;

use pixstore_core::{MessageId, TicketId, TicketStatus, UserId};

use super::RepositoryError;
use crate::models::{Message, Ticket, TicketSummary};

const TICKET_COLUMNS: &str = "id, user_id, subject, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, ticket_id, sender_id, is_admin, message, client_message_id, created_at";

// Customers who never filled in their profile show up as "Usuário".
const SUMMARY_SELECT: &str = r"
    SELECT
        t.id, t.user_id, t.subject, t.status, t.created_at, t.updated_at,
        COALESCE(NULLIF(p.display_name, ''), 'Usuário') AS user_name,
        u.email AS user_email,
        (SELECT m.message FROM support_messages m
         WHERE m.ticket_id = t.id
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT 1) AS last_message
    FROM support_tickets t
    JOIN users u ON u.id = t.user_id
    LEFT JOIN profiles p ON p.user_id = t.user_id
";

/// A message to append to a ticket.
#[derive(Debug, Clone)]
pub struct NewMessage<'m> {
    pub sender_id: UserId,
    pub is_admin: bool,
    pub message: &'m str,
    pub client_message_id: Option<&'m str>,
}

/// Repository for support ticket operations.
pub struct SupportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A customer's tickets, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TicketSummary>, RepositoryError> {
        let tickets = sqlx::query_as::<_, TicketSummary>(&format!(
            "{SUMMARY_SELECT} WHERE t.user_id = $1 ORDER BY t.updated_at DESC, t.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(tickets)
    }

    /// Every ticket, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<TicketSummary>, RepositoryError> {
        let tickets = sqlx::query_as::<_, TicketSummary>(&format!(
            "{SUMMARY_SELECT} ORDER BY t.updated_at DESC, t.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(tickets)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(ticket)
    }

    /// Open a ticket with its first message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either insert fails.
    pub async fn create_ticket(
        &self,
        user_id: UserId,
        subject: &str,
        first_message: &str,
    ) -> Result<(Ticket, Message), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r"
            INSERT INTO support_tickets (user_id, subject)
            VALUES ($1, $2)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(subject)
        .fetch_one(&mut *tx)
        .await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            r"
            INSERT INTO support_messages (ticket_id, sender_id, is_admin, message)
            VALUES ($1, $2, false, $3)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(ticket.id)
        .bind(user_id)
        .bind(first_message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((ticket, message))
    }

    /// Append a message and bump the ticket's `updated_at`.
    ///
    /// A repeated `client_message_id` on the same ticket does not insert a
    /// second row; the stored message is returned with `false`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_message(
        &self,
        ticket_id: TicketId,
        new: &NewMessage<'_>,
    ) -> Result<(Message, bool), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Message>(&format!(
            r"
            INSERT INTO support_messages (ticket_id, sender_id, is_admin, message, client_message_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ticket_id, client_message_id) DO NOTHING
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(ticket_id)
        .bind(new.sender_id)
        .bind(new.is_admin)
        .bind(new.message)
        .bind(new.client_message_id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = if let Some(message) = inserted {
            sqlx::query("UPDATE support_tickets SET updated_at = NOW() WHERE id = $1")
                .bind(ticket_id)
                .execute(&mut *tx)
                .await?;
            (message, true)
        } else {
            let existing = sqlx::query_as::<_, Message>(&format!(
                r"
                SELECT {MESSAGE_COLUMNS} FROM support_messages
                WHERE ticket_id = $1 AND client_message_id = $2
                "
            ))
            .bind(ticket_id)
            .bind(new.client_message_id)
            .fetch_one(&mut *tx)
            .await?;
            (existing, false)
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Messages of a ticket in send order, optionally only those after `after`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn messages(
        &self,
        ticket_id: TicketId,
        after: Option<MessageId>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS} FROM support_messages
            WHERE ticket_id = $1 AND ($2::int4 IS NULL OR id > $2)
            ORDER BY created_at, id
            "
        ))
        .bind(ticket_id)
        .bind(after)
        .fetch_all(self.pool)
        .await?;
        Ok(messages)
    }

    /// Close a ticket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket does not exist.
    pub async fn close(&self, id: TicketId) -> Result<Ticket, RepositoryError> {
        sqlx::query_as::<_, Ticket>(&format!(
            r"
            UPDATE support_tickets SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(TicketStatus::Closed)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a ticket and its messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket does not exist.
    pub async fn delete(&self, id: TicketId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM support_messages WHERE ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM support_tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}
