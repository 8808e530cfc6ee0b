//! Test-only provider doubles with deterministic behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::provider::{Completer, Embedder};
use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// Maps each input to a unit basis vector selected by its character count,
/// so equal-length texts collide and everything else is orthogonal.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dim: usize,
    pub fail: bool,
    calls: Arc<AtomicUsize>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(dim: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dim)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dim];
        vector[text.chars().count() % self.dim] = 1.0;
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(inputs.len());
        if self.fail {
            return Err(ApiError::EmbeddingService("mock embedder failure".into()));
        }
        Ok(inputs.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Returns a fixed reply; the streamed variant replays scripted deltas and
/// can be told to fail before or mid-stream.
#[derive(Debug, Clone)]
pub struct MockCompleter {
    pub reply: String,
    pub deltas: Vec<String>,
    pub fail_open: bool,
    pub error_after_deltas: Option<String>,
}

impl MockCompleter {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            deltas: Vec::new(),
            fail_open: false,
            error_after_deltas: None,
        }
    }

    pub fn with_deltas(deltas: Vec<&str>) -> Self {
        Self {
            reply: deltas.concat(),
            deltas: deltas.into_iter().map(str::to_string).collect(),
            fail_open: false,
            error_after_deltas: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            deltas: Vec::new(),
            fail_open: true,
            error_after_deltas: None,
        }
    }

    pub fn erroring_after(mut self, message: impl Into<String>) -> Self {
        self.error_after_deltas = Some(message.into());
        self
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ApiError> {
        if self.fail_open {
            return Err(ApiError::CompletionService("mock completion failure".into()));
        }
        Ok(self.reply.clone())
    }

    async fn complete_stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        if self.fail_open {
            return Err(ApiError::CompletionService("mock completion failure".into()));
        }

        let (tx, rx) = mpsc::channel(32);
        let deltas = self.deltas.clone();
        let trailing_error = self.error_after_deltas.clone();
        tokio::spawn(async move {
            for delta in deltas {
                if tx.send(Ok(delta)).await.is_err() {
                    return;
                }
            }
            if let Some(message) = trailing_error {
                let _ = tx.send(Err(ApiError::CompletionService(message))).await;
            }
        });
        Ok(rx)
    }
}
