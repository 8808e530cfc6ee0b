use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, ingest};
use crate::state::AppState;

/// Creates the application router with all routes and middleware:
/// CORS, request tracing, the ingestion endpoint, and the chat endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/ingest", post(ingest::ingest))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

// Extension origins (chrome-extension://...) are unpredictable, so any
// origin is allowed; the listener only binds to loopback.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
