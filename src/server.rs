//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/upload` | Upload an RFI PDF (multipart field `file`) |
//! | `POST` | `/api/chat` | Edit the requirements list or ask a question |
//! | `GET`  | `/api/requirements` | Current requirements list |
//! | `GET`  | `/api/baseline` | Read the baseline questions file |
//! | `POST` | `/api/baseline` | Replace the baseline questions file |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `rate_limited` (429, with a
//! top-level `retryAfter` hint in seconds and a `Retry-After` header),
//! `upstream_unavailable` (503), `upstream_error` and `internal` (500).
//!
//! # Rate limiting
//!
//! A fixed-window per-IP limiter guards `/api/chat` only; upload and read
//! endpoints are unlimited. Upstream 429s that survive the client's retry
//! policy surface with the same `rate_limited` code.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Multipart, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::answer::{self, SourceRef};
use crate::baseline::{Baseline, BaselineStore};
use crate::chunk::chunk_document;
use crate::config::Config;
use crate::editor::{self, EditOp};
use crate::extract;
use crate::index::VectorIndex;
use crate::mistral::{LlmClient, LlmError};
use crate::models::RequirementEntry;
use crate::requirements;
use crate::router::{self, Route};
use crate::session::{Session, SessionDocument, SessionStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn LlmClient>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<RateLimiter>,
    pub baseline: Arc<BaselineStore>,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let limiter = RateLimiter::new(
            Duration::from_millis(config.limits.rate_window_ms),
            config.limits.rate_max_requests,
        );
        let baseline = BaselineStore::new(config.baseline.path.clone());
        Self {
            config: Arc::new(config),
            llm,
            sessions: Arc::new(SessionStore::new()),
            limiter: Arc::new(limiter),
            baseline: Arc::new(baseline),
        }
    }
}

/// Starts the HTTP server and runs until the process is terminated.
pub async fn run_server(config: Config, llm: Arc<dyn LlmClient>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config, llm);
    let app = build_router(state);

    println!("RFI assistant listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Builds the full router. Split out from [`run_server`] so integration
/// tests can serve it on an ephemeral port with a mock provider.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let chat = Router::new()
        .route("/api/chat", post(handle_chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/requirements", get(handle_get_requirements))
        .route(
            "/api/baseline",
            get(handle_get_baseline).post(handle_post_baseline),
        )
        .route("/health", get(handle_health))
        .merge(chat)
        .layer(DefaultBodyLimit::max(state.config.limits.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Rate limiter ============

/// Fixed-window per-IP request counter.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<IpAddr, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `ip`. Returns `Err(retry_after_secs)` when the
    /// caller has exhausted the current window.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        let entry = windows.entry(ip).or_insert((now, 0));

        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }

        if entry.1 < self.max_requests {
            entry.1 += 1;
            Ok(())
        } else {
            let remaining = self.window.saturating_sub(now.duration_since(entry.0));
            Err(remaining.as_secs().max(1))
        }
    }
}

async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    state
        .limiter
        .check(addr.ip())
        .map_err(AppError::rate_limited)?;
    Ok(next.run(req).await)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    retry_after: Option<u64>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            retry_after: None,
        }
    }

    fn rate_limited(retry_after_secs: u64) -> Self {
        let mut e = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests; try again later",
        );
        e.retry_after = Some(retry_after_secs);
        e
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = self.retry_after;
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
            retry_after,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited { retry_after_secs } => AppError::rate_limited(retry_after_secs),
            LlmError::Unavailable(e) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream_unavailable",
                format!("language model provider unreachable: {}", e),
            ),
            LlmError::Upstream { status, message } => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_error",
                format!("language model provider error {}: {}", status, message),
            ),
            LlmError::InvalidResponse(e) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_error",
                format!("language model returned an unusable response: {}", e),
            ),
        }
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

// ============ POST /api/upload ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    session_id: Uuid,
    document_id: String,
    summary: String,
    requirements: Vec<RequirementEntry>,
    chunks: usize,
    uploaded_at: DateTime<Utc>,
}

/// Handler for `POST /api/upload`.
///
/// Accepts a multipart form with a single PDF `file` field. No session
/// state is touched until extraction, embedding, and requirements
/// derivation have all succeeded, so a rejected upload never clobbers an
/// existing document.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
            file = Some((content_type, data));
            break;
        }
    }

    let (content_type, data) =
        file.ok_or_else(|| bad_request("multipart field 'file' is required"))?;

    let pages =
        extract::extract_pages(&data, &content_type).map_err(|e| bad_request(e.to_string()))?;
    let text = extract::join_pages(&pages);

    let chunks = chunk_document(
        &pages,
        state.config.chunking.max_chars,
        state.config.chunking.overlap_chars,
    );
    let chunk_count = chunks.len();

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = state.llm.embed(&texts).await?;

    let requirements = requirements::extract_requirements(state.llm.as_ref(), &text).await?;

    let index = VectorIndex::new();
    index
        .replace(chunks, vectors)
        .map_err(|e| internal(e.to_string()))?;

    let fingerprint = format!("{:x}", Sha256::digest(&data));
    let document = SessionDocument {
        fingerprint: fingerprint.clone(),
        page_count: pages.len(),
        text_chars: text.chars().count(),
        uploaded_at: Utc::now(),
    };
    let summary = requirements.to_markdown();
    let entries = requirements.entries().to_vec();
    let uploaded_at = document.uploaded_at;
    let session = state
        .sessions
        .insert(Session::new(document, requirements, index));

    println!(
        "upload {}: {} pages, {} chunks, {} requirements (session {})",
        &fingerprint[..12],
        pages.len(),
        chunk_count,
        entries.len(),
        session.id
    );

    Ok(Json(UploadResponse {
        session_id: session.id,
        document_id: fingerprint,
        summary,
        requirements: entries,
        chunks: chunk_count,
        uploaded_at,
    }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ChatResponse {
    Edit {
        operation: EditOperation,
    },
    Question {
        response: String,
        sources: Vec<SourceRef>,
    },
}

#[derive(Serialize)]
struct EditOperation {
    #[serde(rename = "type")]
    op: EditOp,
    summary: String,
    requirements: Vec<RequirementEntry>,
}

/// Handler for `POST /api/chat`.
///
/// Routes the message to the requirements editor or the RAG answerer.
/// The requirements list is only replaced after the editor's reply parses,
/// so a malformed reply leaves the session untouched.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let max_chars = state.config.limits.max_message_chars;
    if req.message.chars().count() > max_chars {
        return Err(bad_request(format!(
            "message exceeds {} characters",
            max_chars
        )));
    }

    let session = state
        .sessions
        .resolve(req.session_id)
        .ok_or_else(|| not_found("no uploaded document; POST /api/upload first"))?;

    match router::classify(state.llm.as_ref(), &req.message).await? {
        Route::Edit => {
            let current = session.requirements.read().unwrap().clone();
            let outcome = editor::apply_edit(state.llm.as_ref(), &req.message, &current).await?;
            *session.requirements.write().unwrap() = outcome.requirements.clone();

            println!(
                "edit ({:?}) on session {}: {}",
                outcome.op, session.id, outcome.summary
            );

            Ok(Json(ChatResponse::Edit {
                operation: EditOperation {
                    op: outcome.op,
                    summary: outcome.summary,
                    requirements: outcome.requirements.entries().to_vec(),
                },
            }))
        }
        Route::Question => {
            let answer = answer::answer_question(
                state.llm.as_ref(),
                &session.index,
                &req.message,
                state.config.retrieval.top_k,
            )
            .await?;

            Ok(Json(ChatResponse::Question {
                response: answer.response,
                sources: answer.sources,
            }))
        }
    }
}

// ============ GET /api/requirements ============

#[derive(Deserialize)]
struct RequirementsQuery {
    // Parsed by hand so a malformed value gets the JSON error shape rather
    // than the extractor's plain-text rejection.
    session: Option<String>,
}

#[derive(Serialize)]
struct RequirementsResponse {
    requirements: Vec<RequirementEntry>,
}

/// Handler for `GET /api/requirements`.
///
/// A malformed `?session=` is a 400 and an unknown one a 404; with no
/// session parameter and no uploads yet, the list is simply empty.
async fn handle_get_requirements(
    State(state): State<AppState>,
    Query(query): Query<RequirementsQuery>,
) -> Result<Json<RequirementsResponse>, AppError> {
    if let Some(raw) = query.session {
        let id = Uuid::parse_str(&raw)
            .map_err(|_| bad_request(format!("invalid session id: {}", raw)))?;
        let session = state
            .sessions
            .get(id)
            .ok_or_else(|| not_found(format!("no session with id {}", id)))?;
        let requirements = session.requirements.read().unwrap().entries().to_vec();
        return Ok(Json(RequirementsResponse { requirements }));
    }

    let requirements = state
        .sessions
        .latest()
        .map(|s| s.requirements.read().unwrap().entries().to_vec())
        .unwrap_or_default();
    Ok(Json(RequirementsResponse { requirements }))
}

// ============ GET/POST /api/baseline ============

async fn handle_get_baseline(State(state): State<AppState>) -> Result<Json<Baseline>, AppError> {
    let baseline = state.baseline.load().map_err(|e| internal(e.to_string()))?;
    Ok(Json(baseline))
}

async fn handle_post_baseline(
    State(state): State<AppState>,
    Json(baseline): Json<Baseline>,
) -> Result<Json<Baseline>, AppError> {
    state
        .baseline
        .save(&baseline)
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(baseline))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn limiter_allows_up_to_max_within_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn limiter_tracks_ips_independently() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn limiter_resets_after_window() {
        let limiter = RateLimiter::new(Duration::from_millis(20), 1);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip(1)).is_ok());
    }

    #[test]
    fn limiter_reports_retry_after_at_least_one_second() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        limiter.check(ip(1)).unwrap();
        let retry_after = limiter.check(ip(1)).unwrap_err();
        assert!(retry_after >= 1);
        assert!(retry_after <= 60);
    }
}
