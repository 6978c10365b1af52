//! JSON HTTP API for ingested configurations.
//!
//! Exposes the comparison and question-answering paths over HTTP so audit
//! tooling and dashboards can drive them without the CLI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/files` | List ingested files |
//! | `POST` | `/ask` | Answer a question over the ingested corpus |
//! | `POST` | `/compare` | Compare golden and candidate configurations |
//!
//! # Error Contract
//!
//! Malformed requests (missing query, unknown mode, non-positive `k`)
//! return `400` with:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Collaborator failures (store, generator) are NOT HTTP errors: `/ask`
//! and `/compare` fold them into their `200` response envelope, mirroring
//! the CLI behavior.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! dashboards.

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

use crate::chat;
use crate::config::Config;
use crate::db;
use crate::models::{ChatResponse, CompareMode, FileRecord};
use crate::narrative::{create_generator, NarrativeGenerator};
use crate::store::{ChunkStore, SqliteStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    generator: Arc<dyn NarrativeGenerator>,
}

/// Starts the HTTP API server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. The database must already be initialized.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let generator: Arc<dyn NarrativeGenerator> = Arc::from(create_generator(&config.narrative)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(SqliteStore::new(pool)),
        generator,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/files", get(handle_files))
        .route("/ask", post(handle_ask))
        .route("/compare", post(handle_compare))
        .layer(cors)
        .with_state(state);

    if config.narrative.is_enabled() {
        println!(
            "narrative: {} ({})",
            config.narrative.provider, config.narrative.model
        );
    } else {
        println!("narrative: disabled (deep compare and ask will report errors)");
    }
    println!("Audit server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
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
    /// Machine-readable error code (`"bad_request"`, `"internal"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
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

// ============ GET /files ============

#[derive(Serialize)]
struct FilesResponse {
    files: Vec<FileRecord>,
}

async fn handle_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, AppError> {
    let files = state
        .store
        .list_files()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(FilesResponse { files }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: Option<String>,
    k: Option<i64>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let query = match req.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(bad_request("query must not be empty")),
    };
    if matches!(req.k, Some(k) if k < 1) {
        return Err(bad_request("k must be >= 1"));
    }

    let response = chat::run_ask(
        &state.config,
        state.store.as_ref(),
        state.generator.as_ref(),
        &query,
        req.k,
    )
    .await;

    Ok(Json(response))
}

// ============ POST /compare ============

#[derive(Deserialize)]
struct CompareRequestBody {
    query: Option<String>,
    /// `"quick"` (default) or `"deep"`.
    mode: Option<String>,
    golden: Option<String>,
    candidate: Option<String>,
    k: Option<i64>,
    #[serde(default)]
    exhaustive: bool,
}

async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequestBody>,
) -> Result<Json<ChatResponse>, AppError> {
    let query = match req.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(bad_request("query must not be empty")),
    };
    let mode = match req.mode.as_deref() {
        None => CompareMode::Quick,
        Some(s) => {
            CompareMode::parse(s).ok_or_else(|| bad_request("mode must be quick or deep"))?
        }
    };
    if matches!(req.k, Some(k) if k < 1) {
        return Err(bad_request("k must be >= 1"));
    }

    let compare_req = chat::CompareRequest {
        query,
        mode,
        golden: req.golden,
        candidate: req.candidate,
        k: req.k,
        exhaustive: req.exhaustive,
    };

    let response = chat::run_compare(
        &state.config,
        state.store.as_ref(),
        state.generator.as_ref(),
        &compare_req,
    )
    .await;

    Ok(Json(response))
}
