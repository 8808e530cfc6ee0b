use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("no documents found: {0}")]
    NoDocumentsFound(String),
    #[error("embedding service error: {0}")]
    EmbeddingService(String),
    #[error("completion service error: {0}")]
    CompletionService(String),
    #[error("index not ready: {0}")]
    IndexNotReady(String),
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::Configuration(_) | ApiError::NoDocumentsFound(_) => StatusCode::BAD_REQUEST,
            ApiError::EmbeddingService(_) | ApiError::CompletionService(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::IndexNotReady(_) => StatusCode::CONFLICT,
            ApiError::SourceUnreadable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        let cases = [
            (
                ApiError::Configuration("bad overlap".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::NoDocumentsFound("empty dir".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::EmbeddingService("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::CompletionService("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::IndexNotReady("empty corpus".into()),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
