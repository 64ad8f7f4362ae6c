//! Error types for chat models and answer generation.

use thiserror::Error;

/// Errors raised while talking to a chat model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model service was unreachable, timed out or returned an unusable
    /// response.
    #[error("generation with model '{model}' failed: {message}")]
    Generation { model: String, message: String },

    /// A generation parameter is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ModelError {
    pub(crate) fn generation(model: &str, message: impl Into<String>) -> Self {
        Self::Generation { model: model.to_string(), message: message.into() }
    }

    /// Whether the failure may go away when the call is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
