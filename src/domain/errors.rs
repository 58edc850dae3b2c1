//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP mapping lives in `api::error`.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Referenced resource does not exist (or is not visible to the caller)
    #[error("{0} not found.")]
    NotFound(&'static str),
    /// Request-level validation failure
    #[error("{0}")]
    Validation(String),
    /// Validation failure attached to a single input field
    #[error("{field}: {message}")]
    InvalidField { field: &'static str, message: String },
    /// Slot or uniqueness conflict
    #[error("{0}")]
    Conflict(String),
    /// Authenticated caller lacks the rights for this action
    #[error("{0}")]
    Forbidden(String),
    /// Missing, malformed or revoked credentials
    #[error("{0}")]
    Unauthorized(String),
    /// Login failure; never says which half of the credentials was wrong
    #[error("Invalid credentials.")]
    InvalidCredentials,
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

/// True when the database rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
