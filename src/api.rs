//! HTTP surface for the tutoring backend.
//!
//! - `POST /ingest` – Extract a document (or take raw text), chunk, embed, and index it.
//! - `POST /search` – Return the chunk texts most similar to a query.
//! - `POST /context` – Same as search, joined into one newline-separated block for a prompt.
//! - `GET /metrics` – Ingestion and search counters.
//! - `GET /commands` – Machine-readable command catalog.
//! - `POST /progress/scores` – Record a quiz result.
//! - `GET /progress/weak-topics`, `GET /progress/history`, `GET /progress/achievements` – Read
//!   the learner's progress ledger.
//!
//! Invalid input maps to `400`; embedding or index failures map to `503`.

use crate::metrics::MetricsSnapshot;
use crate::processing::{EngineError, RetrievalApi};
use crate::progress::{
    Achievement, PerformanceRecord, ProgressError, ProgressStore, ScoreOutcome, WeakTopic,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Shared handler state: the retrieval engine and the progress ledger.
pub struct AppState<S> {
    engine: Arc<S>,
    progress: Arc<ProgressStore>,
}

impl<S> AppState<S> {
    /// Bundle an engine and a progress ledger.
    pub fn new(engine: Arc<S>, progress: Arc<ProgressStore>) -> Self {
        Self { engine, progress }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            progress: Arc::clone(&self.progress),
        }
    }
}

/// Build the HTTP router.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: RetrievalApi + 'static,
{
    Router::new()
        .route("/ingest", post(ingest_document::<S>))
        .route("/search", post(search::<S>))
        .route("/context", post(context::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .route("/progress/scores", post(record_score::<S>))
        .route("/progress/weak-topics", get(weak_topics::<S>))
        .route("/progress/history", get(history::<S>))
        .route("/progress/achievements", get(achievements::<S>))
        .with_state(state)
}

/// Request body for `POST /ingest`. Exactly one of `path` or `text` must be set.
#[derive(Deserialize)]
struct IngestRequest {
    /// Server-side document path (pdf, txt, md, png, jpg, jpeg).
    #[serde(default)]
    path: Option<String>,
    /// Raw text to index instead of a file.
    #[serde(default)]
    text: Option<String>,
    /// OCR output or other text prepended to the extracted content.
    #[serde(default)]
    precomputed_text: Option<String>,
    /// Label stored alongside raw-text chunks.
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    chunks_indexed: usize,
}

async fn ingest_document<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: RetrievalApi,
{
    let chunks_indexed = match (request.path, request.text) {
        (Some(path), None) => {
            let precomputed = request.precomputed_text.unwrap_or_default();
            state.engine.ingest(Path::new(&path), &precomputed).await?
        }
        (None, Some(text)) => {
            state
                .engine
                .ingest_text(&text, request.source.as_deref())
                .await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "provide exactly one of `path` or `text`".to_string(),
            ));
        }
    };
    tracing::info!(chunks = chunks_indexed, "Ingest request completed");
    Ok(Json(IngestResponse { chunks_indexed }))
}

/// Request body shared by `POST /search` and `POST /context`.
#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    /// Defaults to `SEARCH_TOP_K`.
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<String>,
}

async fn search<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: RetrievalApi,
{
    let top_k = request.top_k.unwrap_or_else(|| state.engine.default_top_k());
    let results = state.engine.search(&request.query, top_k).await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Serialize)]
struct ContextResponse {
    context: String,
}

async fn context<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<ContextResponse>, AppError>
where
    S: RetrievalApi,
{
    let top_k = request.top_k.unwrap_or_else(|| state.engine.default_top_k());
    let context = state.engine.context(&request.query, top_k).await?;
    Ok(Json(ContextResponse { context }))
}

async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: RetrievalApi,
{
    Json(state.engine.metrics_snapshot())
}

/// Request body for `POST /progress/scores`.
#[derive(Deserialize)]
struct ScoreRequest {
    topic: String,
    score: u32,
    total: u32,
    #[serde(default = "default_level")]
    level: String,
}

fn default_level() -> String {
    "beginner".to_string()
}

async fn record_score<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreOutcome>, AppError> {
    let progress = Arc::clone(&state.progress);
    let outcome = tokio::task::spawn_blocking(move || {
        progress.record_score(&request.topic, request.score, request.total, &request.level)
    })
    .await
    .map_err(|error| AppError::Internal(format!("ledger task failed: {error}")))??;
    Ok(Json(outcome))
}

#[derive(Serialize)]
struct WeakTopicsResponse {
    weak_topics: Vec<WeakTopic>,
}

async fn weak_topics<S>(State(state): State<AppState<S>>) -> Json<WeakTopicsResponse> {
    Json(WeakTopicsResponse {
        weak_topics: state.progress.weak_topics(),
    })
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<PerformanceRecord>,
}

async fn history<S>(State(state): State<AppState<S>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.progress.history(),
    })
}

#[derive(Serialize)]
struct AchievementsResponse {
    achievements: Vec<Achievement>,
}

async fn achievements<S>(State(state): State<AppState<S>>) -> Json<AchievementsResponse> {
    Json(AchievementsResponse {
        achievements: state.progress.achievements(),
    })
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/ingest",
                description: "Extract, chunk, embed, and index a document or raw text. Returns { \"chunks_indexed\": number }.",
                request_example: Some(json!({
                    "path": "uploads/lecture-notes.pdf",
                    "precomputed_text": ""
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Return up to top_k indexed chunk texts ranked by similarity to the query.",
                request_example: Some(json!({ "query": "What is photosynthesis?", "top_k": 3 })),
            },
            CommandDescriptor {
                name: "context",
                method: "POST",
                path: "/context",
                description: "Search and join the results into one newline-separated context block.",
                request_example: Some(json!({ "query": "What is photosynthesis?" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and search counters.",
                request_example: None,
            },
            CommandDescriptor {
                name: "record_score",
                method: "POST",
                path: "/progress/scores",
                description: "Record a quiz result; low scores mark the topic weak and perfect scores award a badge.",
                request_example: Some(json!({
                    "topic": "Photosynthesis",
                    "score": 2,
                    "total": 3,
                    "level": "intermediate"
                })),
            },
            CommandDescriptor {
                name: "weak_topics",
                method: "GET",
                path: "/progress/weak-topics",
                description: "Return up to ten weak topics, most frequent first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/progress/history",
                description: "Return every recorded quiz result, newest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "achievements",
                method: "GET",
                path: "/progress/achievements",
                description: "Return earned badges, newest first.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Engine(EngineError),
    Progress(ProgressError),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Engine(error) if error.is_client_error() => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Engine(error) => {
                tracing::warn!(error = %error, "Retrieval request failed upstream");
                (StatusCode::SERVICE_UNAVAILABLE, error.to_string())
            }
            Self::Progress(error @ ProgressError::InvalidScore { .. }) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Progress(error) => {
                tracing::error!(error = %error, "Progress ledger update failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => {
                tracing::error!(error = %message, "Request handler failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(inner: EngineError) -> Self {
        Self::Engine(inner)
    }
}

impl From<ProgressError> for AppError {
    fn from(inner: ProgressError) -> Self {
        Self::Progress(inner)
    }
}
