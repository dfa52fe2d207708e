//! Account errors.

use thiserror::Error;

use pixstore_core::{EmailError, UserId};

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A session refers to an account that no longer exists.
    #[error("account {0} not found")]
    AccountMissing(UserId),

    #[error("email already registered")]
    EmailTaken,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}
