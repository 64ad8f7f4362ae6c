use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;

/// Ask questions about a folder of PDFs using a local Ollama server.
#[derive(Debug, Parser)]
#[command(name = "pdfqa", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, env = "PDFQA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the Ollama server.
    #[arg(long, global = true, env = "PDFQA_OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Model used to embed chunks and questions.
    #[arg(long, global = true, env = "PDFQA_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Model used to generate answers.
    #[arg(long, global = true, env = "PDFQA_GENERATION_MODEL")]
    pub generation_model: Option<String>,

    /// Log filter, e.g. `info` or `pdfqa_rag=debug`.
    #[arg(long, global = true, env = "PDFQA_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Extract text from the PDF directory into the text directory.
    Extract,
    /// Chunk, embed and index documents, then save the index.
    Ingest {
        /// Index the previously extracted text files instead of the PDFs.
        #[arg(long)]
        from_text: bool,
    },
    /// Chat with the indexed documents in the terminal.
    Chat,
    /// Serve the web chat interface.
    Serve {
        #[arg(long, env = "PDFQA_HOST")]
        host: Option<String>,
        #[arg(long, env = "PDFQA_PORT")]
        port: Option<u16>,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let (host, port) = match &self.command {
            Command::Serve { host, port } => (host.clone(), *port),
            _ => (None, None),
        };
        Overrides {
            ollama_url: self.ollama_url.clone(),
            embedding_model: self.embedding_model.clone(),
            generation_model: self.generation_model.clone(),
            log_level: self.log_level.clone(),
            host,
            port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pdfqa",
            "serve",
            "--port",
            "9000",
            "--generation-model",
            "llama3",
        ])
        .unwrap();

        assert_eq!(cli.command, Command::Serve { host: None, port: Some(9000) });
        let overrides = cli.overrides();
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.generation_model.as_deref(), Some("llama3"));
    }

    #[test]
    fn parses_ingest_from_text() {
        let cli = Cli::try_parse_from(["pdfqa", "--config", "custom.toml", "ingest", "--from-text"]).unwrap();
        assert_eq!(cli.command, Command::Ingest { from_text: true });
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["pdfqa"]).is_err());
    }
}
