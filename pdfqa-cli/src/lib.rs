//! Building blocks of the `pdfqa` binary: argument parsing, configuration
//! and the subcommands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::{AppConfig, Overrides, load_config};
