use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::errors::ServiceError;
use super::token::TokenError;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Username,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Email => f.write_str("Email exists"),
            ConflictField::Username => f.write_str("Username exists"),
        }
    }
}

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(ConflictField),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error(transparent)]
    Storage(#[from] ServiceError),
    #[error("notification error: {0}")]
    Notification(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict(_) => 1002,
            AuthError::NotFound(_) => 1003,
            AuthError::Unauthorized(_) => 1004,
            AuthError::Forbidden(_) => 1005,
            AuthError::Hash(_) => 1101,
            AuthError::Token(_) => 1102,
            AuthError::Repository(_) => 1200,
            AuthError::Storage(_) => 1201,
            AuthError::Notification(_) => 1300,
        }
    }

    /// Failures of a collaborator rather than of the caller's request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Hash(_) | AuthError::Token(_) | AuthError::Repository(_) | AuthError::Storage(_) | AuthError::Notification(_)
        )
    }

    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Key(_) | TokenError::Signing(_) => AuthError::Token(e.to_string()),
            other => {
                tracing::debug!(reason = %other, "token_rejected");
                AuthError::Unauthorized("Invalid token")
            }
        }
    }
}
