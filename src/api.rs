//! REST API Server for the crypto query bot
//!
//! Exposes the orchestrator via HTTP endpoints so a chat transport can hand
//! over raw user text and get the reply text back.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::{reply_or_fallback, Orchestrator};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplyRequest {
    pub text: String,
    /// Opaque id used to correlate log lines; generated when absent.
    pub request_id: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Reply Endpoint
/// =============================

async fn reply_handler(
    State(state): State<ApiState>,
    Json(req): Json<ReplyRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message text is empty".into())),
        );
    }

    let request_id = req
        .request_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!("[{}] Processing new query. Content: '{}'", request_id, text);

    // Each query runs on its own task so a slow scrape never stalls others.
    let orchestrator = state.orchestrator.clone();
    let task_request_id = request_id.clone();
    let joined = tokio::spawn(async move {
        orchestrator.generate_reply(&text, &task_request_id).await
    })
    .await;
    if joined.is_err() {
        error!("[{}] Reply task failed", request_id);
    }
    let reply = reply_or_fallback(joined);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "reply": reply,
            "request_id": request_id,
        }))),
    )
}

/// =============================
/// Symbol Refresh Endpoint
/// =============================

async fn refresh_symbols(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let symbols = state.orchestrator.symbols();
    let refreshed = symbols.refresh().await;
    let aliases = symbols.snapshot().await.len();

    let status = if refreshed {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    (
        status,
        Json(ApiResponse {
            success: refreshed,
            data: Some(serde_json::json!({
                "refreshed": refreshed,
                "aliases": aliases,
            })),
            error: (!refreshed).then(|| "Market data refresh failed; previous map kept".to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/reply", post(reply_handler))
        .route("/api/symbols/refresh", post(refresh_symbols))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
