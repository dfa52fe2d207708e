//! User and profile repository.

use sqlx::PgPool;

use pixstore_core::{Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique};
use crate::models::user::{AdminUserSummary, Profile, User};

const USER_COLUMNS: &str = "id, email, role, created_at, last_sign_in_at";

/// User row joined with its password hash, used only at login.
#[derive(sqlx::FromRow)]
struct UserWithHash {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Profile fields a customer can edit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a customer account and its empty profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create_with_profile(
        &self,
        email: &Email,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        sqlx::query(
            r"
            INSERT INTO profiles (user_id, display_name)
            VALUES ($1, $2)
            ",
        )
        .bind(user.id)
        .bind(display_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Get a user and password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHash>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Record a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch_last_sign_in(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_sign_in_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    pub async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Get a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r"
            SELECT user_id, display_name, phone, avatar_url, created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }

    /// Replace the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        sqlx::query_as::<_, Profile>(
            r"
            UPDATE profiles
            SET display_name = $2, phone = $3, avatar_url = $4, updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, display_name, phone, avatar_url, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(update.display_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.avatar_url.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// All accounts with profile data and order statistics, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_stats(&self) -> Result<Vec<AdminUserSummary>, RepositoryError> {
        let users = sqlx::query_as::<_, AdminUserSummary>(
            r"
            SELECT
                u.id, u.email, u.role, u.created_at, u.last_sign_in_at,
                p.display_name, p.phone, p.avatar_url,
                COUNT(o.id) AS total_orders,
                COUNT(o.id) FILTER (WHERE o.status = 'pending') AS pending_orders,
                COUNT(o.id) FILTER (
                    WHERE o.status IN ('approved', 'processing', 'shipped', 'delivered')
                ) AS completed_orders,
                COALESCE(SUM(o.total) FILTER (
                    WHERE o.status IN ('approved', 'processing', 'shipped', 'delivered')
                ), 0) AS total_spent,
                MAX(o.created_at) AS last_order_date,
                COUNT(o.id) FILTER (
                    WHERE o.status IN ('approved', 'processing', 'shipped', 'delivered')
                ) > 0 AS has_purchased
            FROM users u
            LEFT JOIN profiles p ON p.user_id = u.id
            LEFT JOIN orders o ON o.user_id = u.id
            GROUP BY u.id, p.user_id
            ORDER BY u.created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}
