//! Global subscriber initialization.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log filter '{0}'")]
    Filter(String),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Where and how to log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    /// Default filter directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Write the log file as JSON lines instead of plain text.
    pub json: bool,
    /// Also log to stdout. The terminal chat turns this off to keep the
    /// prompt clean.
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: PathBuf::from("logs"), level: "info".to_string(), json: false, stdout: true }
    }
}

/// `pdfqa_{YYYYmmdd_HHMMSS}.log`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("pdfqa_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber and return the path of this run's log file.
///
/// # Errors
///
/// Fails if the log directory or file cannot be created, the filter does not
/// parse, or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<PathBuf, TelemetryError> {
    let path = config.log_dir.join(log_file_name(Local::now()));
    let file = open_log_file(&config.log_dir, &path)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|_| TelemetryError::Filter(config.level.clone()))?,
    };

    let mut layers = Vec::new();
    let file_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).with_target(true);
    if config.json {
        layers.push(file_layer.json().boxed());
    } else {
        layers.push(file_layer.boxed());
    }
    if config.stdout {
        layers.push(fmt::layer().with_target(false).boxed());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    info!(log_file = %path.display(), level = %config.level, "logging initialized");
    Ok(path)
}

fn open_log_file(dir: &Path, path: &Path) -> Result<std::fs::File, TelemetryError> {
    let to_error = |source: std::io::Error| TelemetryError::LogFile { path: path.to_path_buf(), source };
    std::fs::create_dir_all(dir).map_err(to_error)?;
    OpenOptions::new().create(true).append(true).open(path).map_err(to_error)
}
