use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pdfqa_rag::RagError;
use pdfqa_session::SessionError;
use serde_json::json;
use thiserror::Error;

use crate::service::ServiceError;

/// Errors returned by HTTP handlers, rendered as `{"error": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The answer could not be generated; the client may retry with `retry_id`.
    #[error("{message}")]
    Generation { message: String, retry_id: String },

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Generation { .. } | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::EmptyQuestion => Self::BadRequest(error.to_string()),
            ServiceError::UnknownRetry(_) => Self::NotFound(error.to_string()),
            ServiceError::Generation { retry_id, source } => {
                Self::Generation { message: source.to_string(), retry_id }
            }
            ServiceError::Retrieval(rag) => match rag {
                RagError::EmbeddingService { .. } => Self::Upstream(format!("retrieval failed: {rag}")),
                other => Self::Internal(format!("retrieval failed: {other}")),
            },
            ServiceError::Session(session) => session.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound { .. } => Self::NotFound(error.to_string()),
            SessionError::InvalidFeedback(_) => Self::BadRequest(error.to_string()),
            SessionError::Io(_) | SessionError::Serialization(_) => Self::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Generation { message, retry_id } => json!({"error": message, "retry_id": retry_id}),
            other => json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
