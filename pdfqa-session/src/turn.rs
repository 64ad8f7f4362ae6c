//! Conversation turns and the feedback attached to them.

use chrono::{DateTime, Utc};
use pdfqa_rag::SourceRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// A user's rating of an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Feedback {
    /// Create feedback, rejecting ratings outside `1..=5`.
    pub fn new(rating: u8, comment: Option<String>) -> Result<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(SessionError::InvalidFeedback(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            )));
        }
        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        Ok(Self { rating, comment, submitted_at: Utc::now() })
    }
}

/// One question and the answer it received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub id: String,
    pub query: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
    /// Time spent retrieving and generating, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
    /// Whether the answer came from the response cache.
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Turn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            answer: answer.into(),
            sources,
            timestamp: Utc::now(),
            latency_ms: 0,
            cached: false,
            feedback: None,
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_enforced() {
        assert!(Feedback::new(0, None).is_err());
        assert!(Feedback::new(6, None).is_err());
        assert!(Feedback::new(1, None).is_ok());
        assert!(Feedback::new(5, None).is_ok());
    }

    #[test]
    fn blank_comment_is_dropped() {
        let feedback = Feedback::new(3, Some("   ".to_string())).unwrap();
        assert_eq!(feedback.comment, None);
    }

    #[test]
    fn turns_get_unique_ids() {
        let a = Turn::new("q", "a", Vec::new());
        let b = Turn::new("q", "a", Vec::new());
        assert_ne!(a.id, b.id);
        assert!(a.feedback.is_none());
    }
}
