use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "PageSense Backend API",
        "endpoints": {
            "health": "/health",
            "ingest": "/ingest (POST)",
            "chat": "/chat (POST)",
            "chat_stream": "/chat/stream (POST)"
        },
        "status": "running"
    }))
}

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
