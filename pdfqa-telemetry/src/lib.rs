//! # pdfqa-telemetry
//!
//! Structured logging for pdfqa binaries.
//!
//! [`init_logging`] installs the global subscriber: human-readable output on
//! stdout plus one append-only file per run under the log directory.
//! [`EventCapture`] is a layer that records events in memory so tests can
//! assert on structured fields.

pub mod capture;
pub mod init;

pub use capture::{CapturedEvent, EventCapture};
pub use init::{LoggingConfig, TelemetryError, init_logging, log_file_name};
