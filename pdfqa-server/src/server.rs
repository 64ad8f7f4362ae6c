use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdfqa_session::Turn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::service::{QaService, ServiceStats};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QaService>,
}

impl AppState {
    pub fn new(service: Arc<QaService>) -> Self {
        Self { service }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreateResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    pub path: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{session_id}", get(get_session).delete(clear_session))
        .route("/api/sessions/{session_id}/ask", post(ask))
        .route("/api/sessions/{session_id}/retry/{retry_id}", post(retry))
        .route("/api/sessions/{session_id}/turns/{turn_id}/feedback", post(feedback))
        .route("/api/sessions/{session_id}/export", post(export))
        .route("/api/sessions/{session_id}/close", post(close_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the web interface until Ctrl-C.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("pdfqa listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "pdfqa"}))
}

async fn stats(State(state): State<AppState>) -> Result<Json<ServiceStats>, ApiError> {
    Ok(Json(state.service.stats().await?))
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.service.create_session().await;
    Json(SessionCreateResponse { session_id })
}

async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let history = state.service.history(&session_id).await?;
    Ok(Json(SessionResponse { session_id, turns: history.turns().to_vec() }))
}

async fn clear_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.service.clear(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Forget the session entirely; the page calls this when it is closed.
async fn close_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.service.remove(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ask(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Turn>, ApiError> {
    Ok(Json(state.service.ask(&session_id, &request.question).await?))
}

async fn retry(
    Path((session_id, retry_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<Turn>, ApiError> {
    Ok(Json(state.service.retry(&session_id, &retry_id).await?))
}

async fn feedback(
    Path((session_id, turn_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Turn>, ApiError> {
    let rating = u8::try_from(request.rating)
        .map_err(|_| ApiError::BadRequest(format!("rating must be between 1 and 5, got {}", request.rating)))?;
    Ok(Json(state.service.feedback(&session_id, &turn_id, rating, request.comment).await?))
}

async fn export(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExportResponse>, ApiError> {
    let path = state.service.export(&session_id).await?;
    Ok(Json(ExportResponse { path: path.display().to_string() }))
}
