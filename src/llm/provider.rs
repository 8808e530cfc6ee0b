use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// Capability interface for the hosted completion service.
#[async_trait]
pub trait Completer: Send + Sync {
    /// chat completion (non-streaming); returns the first choice's text
    async fn complete(&self, request: CompletionRequest) -> Result<String, ApiError>;

    /// chat completion (streaming); the receiver yields text deltas in
    /// arrival order, then closes on normal completion
    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;
}

/// Capability interface for the hosted embedding service. One vector per
/// input, in input order; batching is the caller's concern.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
