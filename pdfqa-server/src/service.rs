//! Question answering for interactive sessions.
//!
//! [`QaService`] ties retrieval, generation and session history together.
//! The web server and the terminal chat both drive it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use pdfqa_model::{AnswerGenerator, ModelError, PreparedQuery, ResponseCache};
use pdfqa_rag::{IndexStats, RagError, RagPipeline};
use pdfqa_session::{Feedback, SessionError, SessionHistory, SessionManager, Turn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RagError),

    /// Generation failed; the prepared query is kept under `retry_id`.
    #[error("{source}")]
    Generation {
        retry_id: String,
        #[source]
        source: ModelError,
    },

    #[error("no pending retry '{0}'")]
    UnknownRetry(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Index and model summary for status displays.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceStats {
    #[serde(flatten)]
    pub index: IndexStats,
    pub generation_model: String,
    pub active_sessions: usize,
    pub cached_answers: usize,
}

/// Answers questions within sessions and records every turn.
pub struct QaService {
    pipeline: Arc<RagPipeline>,
    generator: Arc<AnswerGenerator>,
    sessions: SessionManager,
    collection: String,
    export_dir: PathBuf,
    cache: Mutex<ResponseCache>,
    /// Failed generations awaiting retry, by session then retry id.
    pending: Mutex<HashMap<String, HashMap<String, PreparedQuery>>>,
}

impl QaService {
    pub fn new(
        pipeline: Arc<RagPipeline>,
        generator: Arc<AnswerGenerator>,
        collection: impl Into<String>,
        export_dir: impl Into<PathBuf>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            pipeline,
            generator,
            sessions: SessionManager::new(),
            collection: collection.into(),
            export_dir: export_dir.into(),
            cache: Mutex::new(ResponseCache::new(cache_capacity)),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn create_session(&self) -> String {
        self.sessions.create().await
    }

    pub async fn history(&self, session_id: &str) -> Result<SessionHistory, ServiceError> {
        Ok(self.sessions.get(session_id).await?)
    }

    /// Answer `question` in the context of the session's recent turns.
    ///
    /// Repeated questions with the same history are served from the cache.
    /// When generation fails the prepared query is kept so [`Self::retry`]
    /// can finish it without retrieving again.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<Turn, ServiceError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::EmptyQuestion);
        }
        let started = Instant::now();
        let window = self.generator.config().history_window;
        let history = self.sessions.recent_exchanges(session_id, window).await?;

        let cached = self.cache.lock().await.get(question, &history);
        if let Some(answer) = cached {
            let turn = Turn::new(question, answer.text, answer.sources)
                .with_latency_ms(started.elapsed().as_millis() as u64)
                .with_cached(true);
            self.sessions.append_turn(session_id, turn.clone()).await?;
            info!(session.id = %session_id, turn.id = %turn.id, latency_ms = turn.latency_ms, cached = true, "answered question");
            return Ok(turn);
        }

        let context = self.pipeline.query(&self.collection, question).await.inspect_err(|e| {
            warn!(session.id = %session_id, error = %e, "retrieval failed");
        })?;

        let prepared = PreparedQuery { question: question.to_string(), context, history };
        self.complete(session_id, prepared, started).await
    }

    /// Retry a failed generation kept under `retry_id`.
    pub async fn retry(&self, session_id: &str, retry_id: &str) -> Result<Turn, ServiceError> {
        if !self.sessions.contains(session_id).await {
            return Err(SessionError::NotFound { kind: "session", id: session_id.to_string() }.into());
        }
        let prepared = self
            .pending
            .lock()
            .await
            .get_mut(session_id)
            .and_then(|queries| queries.remove(retry_id))
            .ok_or_else(|| ServiceError::UnknownRetry(retry_id.to_string()))?;
        info!(session.id = %session_id, retry.id = %retry_id, "retrying generation");
        self.complete(session_id, prepared, Instant::now()).await
    }

    async fn complete(
        &self,
        session_id: &str,
        prepared: PreparedQuery,
        started: Instant,
    ) -> Result<Turn, ServiceError> {
        match self.generator.generate(&prepared).await {
            Ok(answer) => {
                self.cache.lock().await.insert(&prepared.question, &prepared.history, answer.clone());
                let turn = Turn::new(prepared.question, answer.text, answer.sources)
                    .with_latency_ms(started.elapsed().as_millis() as u64);
                self.sessions.append_turn(session_id, turn.clone()).await?;
                info!(
                    session.id = %session_id,
                    turn.id = %turn.id,
                    sources = turn.sources.len(),
                    latency_ms = turn.latency_ms,
                    cached = false,
                    "answered question"
                );
                Ok(turn)
            }
            Err(failure) => {
                let retry_id = Uuid::new_v4().to_string();
                warn!(
                    session.id = %session_id,
                    retry.id = %retry_id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    error = %failure.error,
                    "question failed"
                );
                self.pending
                    .lock()
                    .await
                    .entry(session_id.to_string())
                    .or_default()
                    .insert(retry_id.clone(), failure.query);
                Err(ServiceError::Generation { retry_id, source: failure.error })
            }
        }
    }

    pub async fn feedback(
        &self,
        session_id: &str,
        turn_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Turn, ServiceError> {
        let feedback = Feedback::new(rating, comment)?;
        let turn = self.sessions.attach_feedback(session_id, turn_id, feedback).await?;
        info!(session.id = %session_id, turn.id = %turn_id, rating, "feedback recorded");
        Ok(turn)
    }

    pub async fn export(&self, session_id: &str) -> Result<PathBuf, ServiceError> {
        Ok(self.sessions.export(session_id, &self.export_dir).await?)
    }

    /// Drop a session's turns and pending retries.
    pub async fn clear(&self, session_id: &str) -> Result<(), ServiceError> {
        self.sessions.clear(session_id).await?;
        self.pending.lock().await.remove(session_id);
        Ok(())
    }

    /// End a session: its history and pending retries are dropped.
    pub async fn remove(&self, session_id: &str) -> Result<(), ServiceError> {
        self.sessions.remove(session_id).await?;
        self.pending.lock().await.remove(session_id);
        info!(session.id = %session_id, "session closed");
        Ok(())
    }

    pub async fn stats(&self) -> Result<ServiceStats, ServiceError> {
        Ok(ServiceStats {
            index: self.pipeline.stats(&self.collection).await?,
            generation_model: self.generator.model_name().to_string(),
            active_sessions: self.sessions.list().await.len(),
            cached_answers: self.cache.lock().await.len(),
        })
    }
}
