//! # pdfqa-session
//!
//! Conversation turns, user feedback, and session export for pdfqa.
//!
//! A [`SessionHistory`] is the ordered record of one conversation. The
//! [`SessionManager`] keeps the live sessions of a running server or
//! terminal chat.

pub mod error;
pub mod history;
pub mod manager;
pub mod turn;

pub use error::{Result, SessionError};
pub use history::{SessionExport, SessionHistory};
pub use manager::{SessionManager, SessionSummary};
pub use turn::{Feedback, MAX_RATING, MIN_RATING, Turn};
