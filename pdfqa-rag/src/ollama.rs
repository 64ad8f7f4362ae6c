//! Embedding provider backed by a local Ollama server.
//!
//! Calls the `/api/embed` endpoint, which accepts a batch of inputs and
//! returns one vector per input.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

const PROVIDER: &str = "Ollama";

/// The default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The dimensionality of `nomic-embed-text`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// Connection settings for [`OllamaEmbeddingProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaEmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// An [`EmbeddingProvider`] backed by the Ollama embeddings API.
///
/// Every request is bounded by the configured timeout and retried according
/// to the configured [`RetryPolicy`]; once the attempts are exhausted the
/// failure surfaces as [`RagError::EmbeddingService`].
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::ollama::{OllamaEmbeddingConfig, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::new(OllamaEmbeddingConfig::default())?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    config: OllamaEmbeddingConfig,
}

impl OllamaEmbeddingProvider {
    /// Create a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the model name is empty or the
    /// dimensions are zero, and [`RagError::EmbeddingService`] if the HTTP
    /// client cannot be built.
    pub fn new(config: OllamaEmbeddingConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(RagError::Config("embedding model must not be empty".into()));
        }
        if config.dimensions == 0 {
            return Err(RagError::Config("embedding dimensions must be greater than zero".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::embedding(PROVIDER, format!("failed to build client: {e}")))?;
        let endpoint = format!("{}/api/embed", config.base_url.trim_end_matches('/'));

        Ok(Self { client, endpoint, config })
    }

    async fn request_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbedRequest { model: &self.config.model, input: texts };

        let response =
            self.client.post(&self.endpoint).json(&request_body).send().await.map_err(|e| {
                let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
                error!(provider = PROVIDER, error = %e, reason, "embedding request failed");
                RagError::embedding_unavailable(PROVIDER, format!("{reason}: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            let message = format!("API returned {status}: {detail}");
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                RagError::embedding_unavailable(PROVIDER, message)
            } else {
                RagError::embedding(PROVIDER, message)
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::embedding(
                PROVIDER,
                format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            ));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != self.config.dimensions) {
            return Err(RagError::embedding(
                PROVIDER,
                format!(
                    "model '{}' returned {} dimensions, expected {}",
                    self.config.model,
                    bad.len(),
                    self.config.dimensions
                ),
            ));
        }

        Ok(parsed.embeddings)
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        self.config
            .retry
            .run("embed", RagError::is_transient, || self.request_embeddings(texts))
            .await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
