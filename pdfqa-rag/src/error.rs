//! Error types for the `pdfqa-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, indexing or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source document could not be read or yielded no text.
    #[error("Extraction error ({}): {message}", path.display())]
    Extraction {
        /// The file that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The embedding backend was unreachable or returned a malformed response.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the backend may succeed if asked again (transport errors,
        /// timeouts, 5xx responses).
        retryable: bool,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The collection was indexed with a different embedding model than the one
    /// used for the current request.
    #[error(
        "Embedding model mismatch for collection '{collection}': indexed with \
         '{indexed_model}' ({indexed_dimensions} dims), requested '{requested_model}' \
         ({requested_dimensions} dims)"
    )]
    ModelMismatch {
        /// The collection being accessed.
        collection: String,
        /// Model recorded when the collection was created.
        indexed_model: String,
        /// Dimensions recorded when the collection was created.
        indexed_dimensions: usize,
        /// Model of the provider making the request.
        requested_model: String,
        /// Dimensions of the provider making the request.
        requested_dimensions: usize,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction { path: path.into(), message: message.into() }
    }

    /// A permanent embedding failure, such as a malformed response.
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { provider: provider.into(), message: message.into(), retryable: false }
    }

    /// An embedding failure worth retrying.
    pub(crate) fn embedding_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { provider: provider.into(), message: message.into(), retryable: true }
    }

    /// Whether retrying the failed operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingService { retryable: true, .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
