//! `pdfqa-server` answers questions about indexed PDFs. [`QaService`] runs
//! retrieval and generation for a session; [`app_router`] exposes it over
//! HTTP together with a single-page chat interface.

pub mod error;
pub mod server;
pub mod service;

pub use error::ApiError;
pub use server::{AppState, ServerConfig, app_router, run_server};
pub use service::{QaService, ServiceError, ServiceStats};
