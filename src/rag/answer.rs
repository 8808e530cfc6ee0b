use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::corpus::ChunkMeta;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, Completer, CompletionRequest};

/// Returned when the provider yields no choices or empty content.
pub const NO_RESPONSE_FALLBACK: &str = "No response generated";

/// Framed events of a streamed answer. Exactly one `metadata` first, any
/// number of `content` deltas, then a terminal `done` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Metadata { retrieved: Vec<ChunkMeta> },
    Content { content: String },
    Done,
    Error { error: String },
}

/// Sends assembled prompts to the completion service, blocking or streamed,
/// with fixed sampling parameters.
#[derive(Clone)]
pub struct AnswerService {
    completer: Arc<dyn Completer>,
    temperature: f64,
    max_tokens: u32,
}

impl AnswerService {
    pub fn new(completer: Arc<dyn Completer>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            completer,
            temperature,
            max_tokens,
        }
    }

    fn request(&self, system_prompt: &str, user_prompt: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }

    pub async fn answer(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ApiError> {
        let text = self
            .completer
            .complete(self.request(system_prompt, user_prompt))
            .await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(NO_RESPONSE_FALLBACK.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// Streams a completion as framed events. The receiver sees `metadata`
    /// before any model output; a provider failure at any point becomes a
    /// terminal `error` event instead of a dropped connection. Dropping the
    /// receiver stops provider consumption.
    pub async fn answer_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        retrieved: Vec<ChunkMeta>,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);
        let completer = self.completer.clone();
        let request = self.request(system_prompt, user_prompt);

        tokio::spawn(async move {
            if tx.send(StreamEvent::Metadata { retrieved }).await.is_err() {
                return;
            }

            let mut deltas = match completer.complete_stream(request).await {
                Ok(deltas) => deltas,
                Err(err) => {
                    let _ = tx
                        .send(StreamEvent::Error {
                            error: err.to_string(),
                        })
                        .await;
                    return;
                }
            };

            while let Some(delta) = deltas.recv().await {
                match delta {
                    Ok(content) => {
                        if content.is_empty() {
                            continue;
                        }
                        if tx.send(StreamEvent::Content { content }).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(StreamEvent::Error {
                                error: err.to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }

            let _ = tx.send(StreamEvent::Done).await;
        });

        rx
    }
}
