//! Error types for the chat system.

use parley_database::DatabaseError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    #[error("Attachment error: {message}")]
    Attachment { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

/// Stable classification of a [`ChatError`] for boundary layers that map
/// failures onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    InvalidOperation,
    Attachment,
    Conflict,
    Storage,
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: "Conversation", id: id.into() }
    }

    pub fn user_not_found(username: impl Into<String>) -> Self {
        Self::NotFound { entity: "User", id: username.into() }
    }

    pub fn participant_not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound { entity: "Participant", id: user_id.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden { reason: reason.into() }
    }

    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation { reason: reason.into() }
    }

    pub fn attachment(message: impl Into<String>) -> Self {
        Self::Attachment { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::Attachment { .. } => ErrorKind::Attachment,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }
}

impl From<DatabaseError> for ChatError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Duplicate(message) => Self::Conflict { message },
            other => Self::Storage { message: other.to_string() },
        }
    }
}
