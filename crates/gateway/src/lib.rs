//! HTTP gateway for rolelog.
//!
//! Poses as an OpenAI-compatible chat server. Each `/v1/chat/completions`
//! request is turned into a per-character transcript log and answered with
//! a fixed placeholder completion.
//!
//! Built on Axum.

pub mod completions;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use rolelog_config::AppConfig;
use rolelog_core::pipeline::Pipeline;
use rolelog_core::storage::LogStorage;
use rolelog_logbook::{FsStorage, LogRouter, SeenSet};

/// Largest accepted request body (10 MB).
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub router: LogRouter,
}

impl GatewayState {
    pub fn new(config: AppConfig, storage: Arc<dyn LogStorage>) -> Self {
        Self {
            config,
            pipeline: Pipeline::default(),
            router: LogRouter::new(storage, Arc::new(SeenSet::new())),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// OpenAI-style error body: `{"error": {"message", "type"}}`.
fn error_body(status: StatusCode, message: &str, kind: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": kind,
        }
    });
    (status, Json(body)).into_response()
}

/// A rejected request (`invalid_request_error`).
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    error_body(status, message, "invalid_request_error")
}

/// The catch-all 500 (`server_error`).
pub(crate) fn server_error_response() -> Response {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "server_error",
    )
}

fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    server_error_response()
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let v1 = Router::new()
        .route("/models", get(completions::list_models))
        .route("/chat/completions", post(completions::chat_completions))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    with_layers(
        Router::new()
            .route("/health", get(health_handler))
            .nest("/v1", v1)
            .with_state(state),
    )
}

/// Wrap routes in the gateway's shared layers:
/// - Panics turned into the catch-all 500 body
/// - Request body size limit (10 MB)
/// - Permissive CORS
/// - HTTP trace logging
pub fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server, logging to `config.logs.dir`.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let storage: Arc<dyn LogStorage> = Arc::new(FsStorage::open(config.logs.dir.clone()).await?);

    info!(
        logs_dir = %config.logs.dir.display(),
        model = %config.mock.model,
        keys = config.gateway.api_keys.len(),
        "Transcript logging ready"
    );

    let app = build_router(Arc::new(GatewayState::new(config, storage)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for the /v1 API.
///
/// Requires `Authorization: Bearer <key>` with one of `gateway.api_keys`.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match key {
        Some(key) if state.config.gateway.api_keys.iter().any(|k| k == key) => {
            next.run(req).await
        }
        _ => {
            warn!(path = %req.uri().path(), "Unauthorized request, missing or invalid API key");
            error_response(StatusCode::UNAUTHORIZED, "Invalid API key")
        }
    }
}
