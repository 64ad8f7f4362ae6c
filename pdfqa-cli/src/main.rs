use anyhow::Context;
use clap::Parser;
use pdfqa_cli::{Cli, Command, commands, load_config};
use pdfqa_telemetry::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    config.apply(cli.overrides());
    config.validate()?;

    let mut logging = config.logging.clone();
    if cli.command == Command::Chat {
        logging.stdout = false;
    }
    let log_file = init_logging(&logging).context("Failed to initialize logging")?;
    tracing::info!(log_file = %log_file.display(), command = ?cli.command, "pdfqa starting");

    let result = match cli.command {
        Command::Extract => commands::extract(&config).await,
        Command::Ingest { from_text } => commands::ingest(&config, from_text).await,
        Command::Chat => commands::chat(&config).await,
        Command::Serve { .. } => commands::serve(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "command failed");
    }
    result
}
