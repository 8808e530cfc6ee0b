use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub docs_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    50
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let num_chunks = state
        .pipeline
        .ingest(&request.docs_dir, request.chunk_size, request.overlap)
        .await?;

    Ok(Json(json!({ "status": "ok", "num_chunks": num_chunks })))
}
