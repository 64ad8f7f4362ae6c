//! Error types for session management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn session(id: &str) -> Self {
        Self::NotFound { kind: "session", id: id.to_string() }
    }

    pub(crate) fn turn(id: &str) -> Self {
        Self::NotFound { kind: "turn", id: id.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
