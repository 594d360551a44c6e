//! JSON HTTP API.
//!
//! Exposes the answer service to browser dashboards and other clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/answer` | Answer a question: `{"query": "..."}` → `AnswerResult` |
//! | `POST` | `/reload` | Invalidate the cached context |
//! | `GET`  | `/status` | Whether grounding is available |
//! | `GET`  | `/documents` | Per-document extraction summary |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `context_unavailable` (503).
//!
//! `POST /answer` never fails once the request is valid: model and document
//! problems are reported inside the `AnswerResult` (`source` + `error`).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::AnswerService;
use crate::config::Config;
use crate::models::{AnswerResult, ContextStatus, DocumentSummary};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<AnswerService>,
}

impl AppState {
    pub fn new(service: Arc<AnswerService>) -> Self {
        Self { service }
    }
}

/// Builds the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/answer", post(handle_answer))
        .route("/reload", post(handle_reload))
        .route("/status", get(handle_status))
        .route("/documents", get(handle_documents))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config, service: Arc<AnswerService>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "HTTP server listening");
    eprintln!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn context_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "context_unavailable".to_string(),
        message: message.into(),
    }
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResult>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    Ok(Json(state.service.answer(&req.query).await))
}

// ============ POST /reload ============

#[derive(Serialize)]
struct ReloadResponse {
    reloaded: bool,
}

async fn handle_reload(State(state): State<AppState>) -> Json<ReloadResponse> {
    state.service.reload();
    Json(ReloadResponse { reloaded: true })
}

// ============ GET /status ============

async fn handle_status(State(state): State<AppState>) -> Json<ContextStatus> {
    Json(state.service.status().await)
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let documents = state
        .service
        .documents()
        .await
        .map_err(|e| context_unavailable(e.to_string()))?;
    Ok(Json(DocumentsResponse { documents }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
