//! Answer generation from retrieved context.

use std::sync::Arc;
use std::time::Instant;

use pdfqa_rag::{RetryPolicy, SearchResult, SourceRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::{ChatModel, ChatRequest};
use crate::error::{ModelError, Result};
use crate::ollama::DEFAULT_CHAT_MODEL;
use crate::prompt::{Exchange, PromptBuilder};

/// Parameters controlling answer generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Name of the generation model.
    pub model: String,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
    /// Number of previous exchanges included in the prompt.
    pub history_window: usize,
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.3,
            history_window: 5,
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationConfig {
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::default()
    }

    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the model name is empty or the
    /// temperature is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ModelError::Config("generation model must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ModelError::Config(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Builder for a validated [`GenerationConfig`].
#[derive(Debug, Clone, Default)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn history_window(mut self, window: usize) -> Self {
        self.config.history_window = window;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> Result<GenerationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Everything needed to ask the model one question.
///
/// Kept whole so a failed generation can be retried without retrieving again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedQuery {
    pub question: String,
    pub context: Vec<SearchResult>,
    pub history: Vec<Exchange>,
}

/// A generated answer with the sources it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub model: String,
}

/// A generation that failed after all retries.
///
/// Carries the prepared query back to the caller.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct GenerationFailure {
    pub query: PreparedQuery,
    #[source]
    pub error: ModelError,
}

/// Produces answers grounded on retrieved context.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    config: GenerationConfig,
    prompt: PromptBuilder,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, config: GenerationConfig) -> Self {
        let prompt = PromptBuilder::new(config.history_window);
        Self { model, config, prompt }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate an answer for `query`.
    ///
    /// An empty context still produces an answer; the prompt tells the model
    /// that the documents did not cover the question.
    pub async fn generate(
        &self,
        query: &PreparedQuery,
    ) -> std::result::Result<Answer, GenerationFailure> {
        let request = ChatRequest {
            messages: self.prompt.build(&query.question, &query.context, &query.history),
            temperature: self.config.temperature,
        };
        if query.context.is_empty() {
            warn!(question = %query.question, "generating without document context");
        }

        let started = Instant::now();
        let model_name = self.model.name();
        let model = &self.model;
        let request = &request;
        let outcome = self
            .config
            .retry
            .run("generate", ModelError::is_transient, move || async move {
                let text = model.complete(request.clone()).await?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(ModelError::generation(model_name, "model returned an empty answer"));
                }
                Ok(text.to_string())
            })
            .await;

        match outcome {
            Ok(text) => {
                info!(
                    model = %model_name,
                    context_chunks = query.context.len(),
                    latency_ms = started.elapsed().as_millis() as u64,
                    "generated answer"
                );
                Ok(Answer {
                    text,
                    sources: query.context.iter().map(SourceRef::from).collect(),
                    model: model_name.to_string(),
                })
            }
            Err(error) => {
                warn!(model = %model_name, error = %error, "generation failed");
                Err(GenerationFailure { query: query.clone(), error })
            }
        }
    }
}
