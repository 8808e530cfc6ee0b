use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::rag::context::{build_user_prompt, ChatRequest};
use crate::rag::StreamEvent;
use crate::state::AppState;

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assembled = state.assembler.assemble(&request).await?;
    let user_prompt = build_user_prompt(&request, &assembled.context);
    let answer = state
        .answerer
        .answer(assembled.system_prompt, &user_prompt)
        .await?;

    Ok(Json(json!({
        "answer": answer,
        "retrieved": assembled.retrieved,
    })))
}

/// Streamed variant: the same assembly path, then `data: {json}\n\n` frames
/// forwarded as the provider delivers deltas. Context-assembly failures
/// (e.g. knowledge-base mode on an empty corpus) surface as plain HTTP
/// errors before any stream is opened.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let assembled = state.assembler.assemble(&request).await?;
    let user_prompt = build_user_prompt(&request, &assembled.context);
    let events = state
        .answerer
        .answer_stream(assembled.system_prompt, &user_prompt, assembled.retrieved)
        .await;

    let stream = frame_stream(events);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(ApiError::internal)
}

fn frame_stream(
    events: mpsc::Receiver<StreamEvent>,
) -> impl futures_util::Stream<Item = Result<Bytes, Infallible>> {
    futures_util::stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((Ok(frame(&event)), events))
    })
}

fn frame(event: &StreamEvent) -> Bytes {
    let payload = serde_json::to_string(event).unwrap_or_default();
    Bytes::from(format!("data: {payload}\n\n"))
}
