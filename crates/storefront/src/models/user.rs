//! User and profile types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pixstore_core::{Email, UserId, UserRole};

/// An account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Customer-editable profile data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Back-office view of a customer: account, profile and order statistics.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUserSummary {
    pub id: UserId,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub total_spent: Decimal,
    pub last_order_date: Option<DateTime<Utc>>,
    pub has_purchased: bool,
}
