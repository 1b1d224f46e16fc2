//! HTTP API (`eqa serve`).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/get_nom` | Resolve a free-text query to an equipment (codes 1–4) |
//! | `POST` | `/get_id` | Resolve an equipment ID (codes 1 and 4) |
//! | `POST` | `/ask` | Answer a question about a resolved equipment |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/get_nom` takes `{"query": "..."}`. The query goes through keyword
//! extraction first when a language model is configured. `/get_id` takes the
//! ID as a `?id=` query parameter or as a `{"id": "..."}` body.
//!
//! Lookup responses use the `{code, message, data}` shape of
//! [`SearchResponse`]. Request validation errors use:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::answer::{answer, Answer};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::disambiguation::{classify, classify_id, SearchResponse};
use crate::keywords::search_terms;
use crate::llm::{create_model, LanguageModel};
use crate::resolve::{resolve_by_id, resolve_by_name, MatchParams};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    model: Arc<dyn LanguageModel>,
    params: MatchParams,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, model: Arc<dyn LanguageModel>, params: MatchParams) -> Self {
        Self {
            catalog,
            model,
            params,
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let catalog = Arc::new(Catalog::load(&config.data)?);
    let model = create_model(&config.llm)?;
    let state = AppState::new(catalog, model, MatchParams::from(&config.matching));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "equipment API listening");
    println!("Equipment API listening on http://{}", config.server.bind);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get_nom", post(handle_get_nom))
        .route("/get_id", post(handle_get_id))
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
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

#[derive(Debug)]
pub struct AppError {
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

// ============ POST /get_nom ============

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub query: String,
}

async fn handle_get_nom(
    State(state): State<AppState>,
    Json(req): Json<NameRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let terms = search_terms(state.model.as_ref(), &req.query).await;
    debug!(query = %req.query, terms = %terms, "resolving by name");

    let matches = resolve_by_name(&state.catalog, &terms, &state.params);
    Ok(Json(SearchResponse::from_name_outcome(&classify(&matches))))
}

// ============ POST /get_id ============

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: Option<String>,
}

async fn handle_get_id(
    State(state): State<AppState>,
    Query(query): Query<IdRequest>,
    body: Bytes,
) -> Result<Json<SearchResponse>, AppError> {
    let id = match query.id {
        Some(id) => id,
        None if !body.is_empty() => serde_json::from_slice::<IdRequest>(&body)
            .map_err(|e| bad_request(format!("invalid body: {}", e)))?
            .id
            .unwrap_or_default(),
        None => String::new(),
    };

    if id.trim().is_empty() {
        return Err(bad_request("id must not be empty"));
    }

    let matches = resolve_by_id(&state.catalog, &id);
    Ok(Json(SearchResponse::from_id_outcome(&classify_id(&matches))))
}

// ============ POST /ask ============

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// `answered`, `not_found` or `service_error`.
    pub status: &'static str,
    /// Always present, even on failure.
    pub answer: String,
}

impl From<Answer> for AskResponse {
    fn from(a: Answer) -> Self {
        let status = match a {
            Answer::Answered(_) => "answered",
            Answer::NotFound(_) => "not_found",
            Answer::ServiceError(_) => "service_error",
        };
        Self {
            status,
            answer: a.text(),
        }
    }
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let reply = answer(&state.catalog, state.model.as_ref(), &req.question, &req.id).await;
    Ok(Json(AskResponse::from(reply)))
}
