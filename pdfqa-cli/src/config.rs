//! Configuration loading for the `pdfqa` binary.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line flags and `PDFQA_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use pdfqa_model::{GenerationConfig, OllamaChatConfig};
use pdfqa_model::ollama::DEFAULT_CHAT_MODEL;
use pdfqa_rag::ollama::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL};
use pdfqa_rag::{OllamaEmbeddingConfig, RagConfig, RetryPolicy};
use pdfqa_server::ServerConfig;
use pdfqa_telemetry::LoggingConfig;
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "pdfqa.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub pdf_dir: PathBuf,
    pub text_dir: PathBuf,
    pub index_file: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("pdfs"),
            text_dir: PathBuf::from("extracted_texts"),
            index_file: PathBuf::from("data/index.json"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaSettings {
    pub url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub generation_model: String,
    pub request_timeout_secs: u64,
    /// Attempts per call, including the first.
    pub max_retries: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            generation_model: DEFAULT_CHAT_MODEL.to_string(),
            request_timeout_secs: 120,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub history_window: usize,
    pub cache_capacity: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { temperature: 0.3, history_window: 5, cache_capacity: 128 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self { host: defaults.host, port: defaults.port }
    }
}

/// Everything the binary can be configured with.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub collection: String,
    pub paths: PathsConfig,
    pub rag: RagConfig,
    pub ollama: OllamaSettings,
    pub generation: GenerationSettings,
    pub server: ServerSettings,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collection: "documents".to_string(),
            paths: PathsConfig::default(),
            rag: RagConfig::default(),
            ollama: OllamaSettings::default(),
            generation: GenerationSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Flag and environment overrides; `None` keeps the file value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub ollama_url: Option<String>,
    pub embedding_model: Option<String>,
    pub generation_model: Option<String>,
    pub log_level: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file as TOML")
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.ollama_url {
            self.ollama.url = url;
        }
        if let Some(model) = overrides.embedding_model {
            self.ollama.embedding_model = model;
        }
        if let Some(model) = overrides.generation_model {
            self.ollama.generation_model = model;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    /// Reject inconsistent values before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate().context("invalid [rag] settings")?;
        self.generation_config().context("invalid [generation] settings")?;
        if self.collection.trim().is_empty() {
            anyhow::bail!("collection name must not be empty");
        }
        if self.ollama.embedding_dimensions == 0 {
            anyhow::bail!("ollama.embedding_dimensions must be greater than zero");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_attempts(self.ollama.max_retries)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.request_timeout_secs)
    }

    pub fn embedding_config(&self) -> OllamaEmbeddingConfig {
        OllamaEmbeddingConfig {
            base_url: self.ollama.url.clone(),
            model: self.ollama.embedding_model.clone(),
            dimensions: self.ollama.embedding_dimensions,
            timeout: self.request_timeout(),
            retry: self.retry_policy(),
        }
    }

    pub fn chat_config(&self) -> OllamaChatConfig {
        OllamaChatConfig {
            base_url: self.ollama.url.clone(),
            model: self.ollama.generation_model.clone(),
            timeout: self.request_timeout(),
        }
    }

    pub fn generation_config(&self) -> Result<GenerationConfig> {
        Ok(GenerationConfig::builder()
            .model(&self.ollama.generation_model)
            .temperature(self.generation.temperature)
            .history_window(self.generation.history_window)
            .retry(self.retry_policy())
            .build()?)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig { host: self.server.host.clone(), port: self.server.port }
    }
}

/// Load the configuration file, if any.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
/// used when present and the defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(AppConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    AppConfig::from_toml(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.top_k, 4);
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.ollama.generation_model, "mistral");
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.paths.index_file, PathBuf::from("data/index.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = AppConfig::from_toml(
            r#"
            collection = "manuals"

            [rag]
            chunk_size = 800

            [ollama]
            generation_model = "llama3"
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.collection, "manuals");
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.ollama.generation_model, "llama3");
        assert_eq!(config.ollama.url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.generation.history_window, 5);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = AppConfig::default();
        config.apply(Overrides {
            ollama_url: Some("http://gpu-box:11434".to_string()),
            port: Some(9000),
            ..Overrides::default()
        });
        assert_eq!(config.embedding_config().base_url, "http://gpu-box:11434");
        assert_eq!(config.chat_config().base_url, "http://gpu-box:11434");
        assert_eq!(config.server_config().port, 9000);
        assert_eq!(config.server_config().host, "127.0.0.1");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = 500;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.temperature = 1.2;
        assert!(config.validate().is_err());
    }
}
