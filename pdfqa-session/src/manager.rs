use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pdfqa_model::Exchange;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::history::SessionHistory;
use crate::turn::{Feedback, Turn};

type SharedHistory = Arc<RwLock<SessionHistory>>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turn_count: usize,
}

/// Shared registry of live sessions. Cheap to clone.
#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, SharedHistory>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> String {
        let history = SessionHistory::new();
        let id = history.id().to_string();
        self.sessions.write().await.insert(id.clone(), Arc::new(RwLock::new(history)));
        debug!(session.id = %id, "created session");
        id
    }

    /// Register an existing history, such as one restored from an export.
    /// Replaces any session with the same id.
    pub async fn restore(&self, history: SessionHistory) -> String {
        let id = history.id().to_string();
        self.sessions.write().await.insert(id.clone(), Arc::new(RwLock::new(history)));
        id
    }

    async fn entry(&self, id: &str) -> Result<SharedHistory> {
        self.sessions.read().await.get(id).cloned().ok_or_else(|| SessionError::session(id))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// A snapshot of the session's history.
    pub async fn get(&self, id: &str) -> Result<SessionHistory> {
        Ok(self.entry(id).await?.read().await.clone())
    }

    pub async fn append_turn(&self, id: &str, turn: Turn) -> Result<()> {
        self.entry(id).await?.write().await.append(turn);
        Ok(())
    }

    pub async fn attach_feedback(&self, id: &str, turn_id: &str, feedback: Feedback) -> Result<Turn> {
        let entry = self.entry(id).await?;
        let mut history = entry.write().await;
        Ok(history.attach_feedback(turn_id, feedback)?.clone())
    }

    pub async fn recent_exchanges(&self, id: &str, n: usize) -> Result<Vec<Exchange>> {
        Ok(self.entry(id).await?.read().await.recent_exchanges(n))
    }

    pub async fn export(&self, id: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let entry = self.entry(id).await?;
        let history = entry.read().await;
        history.export_to_dir(dir).await
    }

    /// Drop every turn but keep the session.
    pub async fn clear(&self, id: &str) -> Result<()> {
        self.entry(id).await?.write().await.clear();
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.sessions.write().await.remove(id).map(|_| ()).ok_or_else(|| SessionError::session(id))
    }

    /// Summaries of all sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let entries: Vec<SharedHistory> = self.sessions.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let history = entry.read().await;
            summaries.push(SessionSummary {
                id: history.id().to_string(),
                created_at: history.created_at(),
                turn_count: history.len(),
            });
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}
