//! Admin role management.
//!
//! # Usage
//!
//! ```bash
//! px-cli admin grant -e admin@example.com
//! px-cli admin revoke -e admin@example.com
//! ```
//!
//! The account must already exist; customers register through the API.

use thiserror::Error;

use pixstore_core::{Email, UserRole};
use pixstore_storefront::db::{self, RepositoryError, UserRepository};

use super::{MissingEnvVar, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No account with email: {0}")]
    UserNotFound(String),

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = db::create_pool(&database_url()?).await?;

    let user = UserRepository::new(&pool)
        .set_role(&parsed, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(parsed.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("{} is now {} (ID: {})", user.email, user.role, user.id);
    Ok(())
}

/// Grant the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses that email.
pub async fn grant(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

/// Revoke the admin role, leaving a plain customer account.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses that email.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Customer).await
}
