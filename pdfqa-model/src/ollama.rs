//! Chat model backed by a local Ollama server.
//!
//! Uses the non-streaming `/api/chat` endpoint: the whole reply arrives in a
//! single JSON body.

use std::time::Duration;

use async_trait::async_trait;
use pdfqa_rag::ollama::DEFAULT_OLLAMA_URL;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chat::{ChatMessage, ChatModel, ChatRequest};
use crate::error::{ModelError, Result};

/// The default generation model.
pub const DEFAULT_CHAT_MODEL: &str = "mistral";

/// Connection settings for [`OllamaChatModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaChatConfig {
    pub base_url: String,
    pub model: String,
    /// Per-request timeout. Generation on a local CPU can be slow.
    pub timeout: Duration,
}

impl Default for OllamaChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// A [`ChatModel`] backed by the Ollama chat API.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_model::ollama::{OllamaChatConfig, OllamaChatModel};
///
/// let model = OllamaChatModel::new(OllamaChatConfig::default())?;
/// ```
pub struct OllamaChatModel {
    client: reqwest::Client,
    endpoint: String,
    config: OllamaChatConfig,
}

impl OllamaChatModel {
    /// Create a new chat model client.
    pub fn new(config: OllamaChatConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(ModelError::Config("generation model must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::generation(&config.model, format!("failed to build client: {e}")))?;
        let endpoint = format!("{}/api/chat", config.base_url.trim_end_matches('/'));

        Ok(Self { client, endpoint, config })
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let model = &self.config.model;
        debug!(model = %model, messages = request.messages.len(), "requesting completion");

        let body = ChatBody {
            model,
            messages: &request.messages,
            stream: false,
            options: Options { temperature: request.temperature },
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await.map_err(|e| {
            error!(model = %model, error = %e, "chat request failed");
            if e.is_timeout() {
                ModelError::generation(
                    model,
                    format!("request timed out after {}s", self.config.timeout.as_secs()),
                )
            } else {
                ModelError::generation(model, format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
            error!(model = %model, %status, "chat API error");
            return Err(ModelError::generation(model, format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %model, error = %e, "failed to parse chat response");
            ModelError::generation(model, format!("failed to parse response: {e}"))
        })?;

        Ok(parsed.message.content)
    }
}
