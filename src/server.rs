//! HTTP gateway.
//!
//! Two protocol surfaces share one dispatch path: the plain REST
//! endpoints here and the JSON-RPC envelope served by [`crate::mcp`].
//! Handlers translate protocol framing only; retrieval, synthesis, and
//! analysis run on blocking workers under a per-request deadline, and
//! every tool request records exactly one metric sample on completion,
//! whether it succeeded, failed, or timed out.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Ask a legal question (REST form of `ask_legal_question`) |
//! | `POST` | `/mcp` | JSON-RPC envelope: `initialize`, `tools/list`, `tools/call` |
//! | `GET`  | `/health` | Liveness check (returns version) |
//! | `GET`  | `/metrics` | Rolling ping and request aggregates |
//!
//! # Error Contract
//!
//! REST errors are a flat JSON body:
//!
//! ```json
//! { "error_kind": "invalid_argument", "message": "question must not be empty" }
//! ```
//!
//! Kinds: `invalid_argument` (400), `not_found` (404), `timeout` (504),
//! `internal` (500). Errors on `/mcp` stay inside the JSON-RPC envelope
//! with HTTP status 200.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients calling either surface cross-origin.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::error::QueryError;
use crate::mcp;
use crate::metrics::{self, MetricSample, MetricsHandle, MetricsSnapshot};
use crate::registry::{self, ToolCall, ToolContext, ToolKind};
use crate::retrieval::RetrievalParams;
use crate::synthesis::SynthesisParams;

/// Shared application state passed to all route handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Corpus plus resolved pipeline knobs, shared across requests.
    pub(crate) tools: Arc<ToolContext>,
    pub(crate) metrics: MetricsHandle,
    pub(crate) request_timeout: Duration,
}

/// Starts the gateway.
///
/// Loads the corpus from `[corpus].dir`, wires the metrics collector and
/// its ping loop, and serves both protocol surfaces on `[server].bind`
/// until the process receives ctrl-c. Shutdown cancels the ping loop and
/// waits for it before returning.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let corpus = Arc::new(CorpusStore::load(
        &config.corpus.dir,
        config.chunking.max_tokens,
    )?);
    let stats = corpus.stats();
    tracing::info!(
        documents = stats.documents,
        passages = stats.passages,
        "corpus loaded"
    );

    let metrics = MetricsHandle::new(
        config.metrics.window_capacity,
        Duration::from_secs(config.metrics.rate_interval_secs),
    );

    let state = AppState {
        tools: Arc::new(ToolContext {
            corpus: corpus.clone(),
            retrieval: RetrievalParams {
                default_top_k: config.retrieval.default_top_k,
                max_top_k: config.retrieval.max_top_k,
            },
            synthesis: SynthesisParams {
                max_passages: config.synthesis.max_passages,
            },
            passage_max_tokens: config.chunking.max_tokens,
        }),
        metrics: metrics.clone(),
        request_timeout: Duration::from_millis(config.server.request_timeout_ms),
    };

    let shutdown = CancellationToken::new();
    let ping_task = metrics::spawn_ping_loop(
        metrics,
        corpus,
        Duration::from_millis(config.metrics.ping_interval_ms),
        shutdown.clone(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/mcp", post(mcp::handle_rpc))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(cors)
        .with_state(state);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "gateway listening");

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    shutdown.cancel();
    let _ = ping_task.await;
    Ok(())
}

/// Resolve, parse, and execute one tool call on a blocking worker under
/// the request deadline.
///
/// This is the single path both surfaces go through; it records exactly
/// one request sample per invocation. The worker is not interrupted on
/// timeout, but its result is discarded and the caller sees
/// [`QueryError::Timeout`].
pub(crate) async fn dispatch_tool(
    state: &AppState,
    tool_name: &str,
    arguments: Value,
) -> Result<Value, QueryError> {
    let started = Instant::now();
    let outcome = run_tool(state, tool_name, arguments).await;
    let elapsed = started.elapsed();

    let timed_out = matches!(outcome, Err(QueryError::Timeout(_)));
    state.metrics.record(MetricSample::request(
        tool_name,
        elapsed,
        outcome.is_ok(),
        timed_out,
    ));

    match &outcome {
        Ok(_) => tracing::debug!(
            tool = tool_name,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request complete"
        ),
        Err(err) => tracing::warn!(tool = tool_name, error = %err, "request failed"),
    }
    outcome
}

async fn run_tool(
    state: &AppState,
    tool_name: &str,
    arguments: Value,
) -> Result<Value, QueryError> {
    let kind = ToolKind::resolve(tool_name)?;
    let call = ToolCall::parse(kind, arguments)?;
    let tools = state.tools.clone();
    let timeout_ms = state.request_timeout.as_millis() as u64;

    let worker = tokio::task::spawn_blocking(move || registry::execute(&call, &tools));
    match tokio::time::timeout(state.request_timeout, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(QueryError::Internal(format!("worker failed: {}", join_err))),
        Err(_) => Err(QueryError::Timeout(timeout_ms)),
    }
}

// ============ REST handlers ============

/// JSON request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

/// Handler for `POST /query`.
///
/// The REST form of the `ask_legal_question` tool: the response carries
/// the answer text, its confidence, the cited sources, and the
/// no-evidence flag. The body is extracted fallibly so an unparsable
/// body or a missing `question` field still answers with the
/// `{error_kind, message}` envelope and records a failed request
/// sample, like every other rejection on this surface.
async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            let err = QueryError::InvalidArgument(rejection.body_text());
            state.metrics.record(MetricSample::request(
                ToolKind::AskLegalQuestion.name(),
                Duration::ZERO,
                false,
                false,
            ));
            tracing::warn!(error = %err, "query body rejected");
            return Err(err.into());
        }
    };
    let arguments = serde_json::json!({ "question": request.question });
    let payload = dispatch_tool(&state, ToolKind::AskLegalQuestion.name(), arguments).await?;
    Ok(Json(payload))
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`. Liveness only: it consults neither the
/// corpus nor the metrics state.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for `GET /metrics`.
async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

// ============ Error response ============

/// Flat REST error body.
#[derive(Serialize)]
struct ErrorBody {
    error_kind: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_kind: self.kind.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        let status = match &err {
            QueryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) | QueryError::UnknownTool(_) => StatusCode::NOT_FOUND,
            QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            QueryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            kind: err.kind(),
            message: err.public_message(),
        }
    }
}
