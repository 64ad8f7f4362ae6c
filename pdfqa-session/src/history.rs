//! The ordered turn history of one session, with JSON export and import.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pdfqa_model::Exchange;
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::turn::{Feedback, Turn};

const SHORT_ID_LEN: usize = 8;

/// Append-only record of a conversation. Only feedback may change after a
/// turn is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHistory {
    id: String,
    created_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

/// The on-disk form of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionExport {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), created_at: Utc::now(), turns: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn get(&self, turn_id: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == turn_id)
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Attach feedback to a turn, replacing any earlier feedback on it.
    pub fn attach_feedback(&mut self, turn_id: &str, feedback: Feedback) -> Result<&Turn> {
        let turn = self
            .turns
            .iter_mut()
            .find(|t| t.id == turn_id)
            .ok_or_else(|| SessionError::turn(turn_id))?;
        turn.feedback = Some(feedback);
        Ok(turn)
    }

    /// The last `n` question/answer pairs, oldest first.
    pub fn recent_exchanges(&self, n: usize) -> Vec<Exchange> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..].iter().map(|t| Exchange::new(&t.query, &t.answer)).collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn to_export(&self) -> SessionExport {
        SessionExport {
            session_id: self.id.clone(),
            created_at: self.created_at,
            exported_at: Utc::now(),
            turns: self.turns.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_export())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let export: SessionExport = serde_json::from_str(json)?;
        Ok(Self::from(export))
    }

    /// Write the session to `dir` as
    /// `conversation_{YYYYmmdd_HHMMSS}_{short id}.json` and return the path.
    ///
    /// An existing file is never overwritten; a second export within the same
    /// second gets a `_2`, `_3`, ... suffix.
    pub async fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let export = self.to_export();
        let json = serde_json::to_string_pretty(&export)?;
        let short_id: String = self.id.chars().take(SHORT_ID_LEN).collect();
        let stem = format!("conversation_{}_{short_id}", export.exported_at.format("%Y%m%d_%H%M%S"));

        let mut attempt = 1u32;
        let (path, mut file) = loop {
            let file_name =
                if attempt == 1 { format!("{stem}.json") } else { format!("{stem}_{attempt}.json") };
            let path = dir.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        info!(session.id = %self.id, turns = self.turns.len(), path = %path.display(), "exported session");
        Ok(path)
    }

    pub async fn import(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }
}

impl From<SessionExport> for SessionHistory {
    fn from(export: SessionExport) -> Self {
        Self { id: export.session_id, created_at: export.created_at, turns: export.turns }
    }
}
