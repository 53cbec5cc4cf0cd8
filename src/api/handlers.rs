//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse, HealthResponse};
use super::AppState;
use crate::engine::{ChatReply, ChatTurn};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat", post(chat))
        .route("/v1/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

/// Universal chat endpoint for all platforms. Every turn runs the full
/// priority cascade and returns a tagged response.
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".to_string()));
    }

    tracing::info!(
        user_id = %req.user_id,
        platform = %req.platform,
        has_message = req.message.is_some(),
        has_action = req.action.is_some(),
        "chat request received"
    );

    let turn = ChatTurn {
        user_id: req.user_id,
        message: req.message.filter(|m| !m.trim().is_empty()),
        action: req.action.filter(|a| !a.trim().is_empty()),
        platform: req.platform,
    };

    let reply = state.manager.process(&turn).await;
    Ok(Json(reply))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = !state.catalog.is_empty();
    Json(HealthResponse {
        status: if loaded { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        diagnostics_loaded: loaded,
        error_codes_count: state.catalog.len(),
    })
}

async fn get_version() -> &'static str {
    concat!("voltdesk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
