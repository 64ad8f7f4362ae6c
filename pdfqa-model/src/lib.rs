//! # pdfqa-model
//!
//! Chat model integration and grounded answer generation for pdfqa.
//!
//! ## Overview
//!
//! - [`ChatModel`] is the completion seam; [`OllamaChatModel`] talks to a
//!   local Ollama server.
//! - [`PromptBuilder`] renders retrieved context, recent history and the
//!   question into chat messages.
//! - [`AnswerGenerator`] retries transient failures and returns the prepared
//!   query on failure so callers can retry later.
//! - [`ResponseCache`] remembers answers to repeated questions.

pub mod cache;
pub mod chat;
pub mod error;
pub mod generator;
pub mod ollama;
pub mod prompt;

pub use cache::ResponseCache;
pub use chat::{ChatMessage, ChatModel, ChatRequest, Role};
pub use error::{ModelError, Result};
pub use generator::{
    Answer, AnswerGenerator, GenerationConfig, GenerationConfigBuilder, GenerationFailure,
    PreparedQuery,
};
pub use ollama::{OllamaChatConfig, OllamaChatModel};
pub use prompt::{Exchange, PromptBuilder};
