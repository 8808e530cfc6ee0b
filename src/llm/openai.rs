use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{Completer, Embedder};
use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// OpenAI-compatible provider client. One instance is configured per role
/// (completion or embeddings) with its own base URL, API key and model.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    fn chat_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": stream,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(m) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
        }
        body
    }
}

#[async_trait]
impl Completer for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.chat_body(&request, false);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::CompletionService(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::CompletionService(format!(
                "chat completion failed with {status}: {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::CompletionService(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.chat_body(&request, true);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::CompletionService(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::CompletionService(format!(
                "streamed completion failed with {status}: {text}"
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            // SSE lines can split across network chunks; carry the tail over.
            let mut buffer = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);
                            if line.is_empty() {
                                continue;
                            }
                            if line == "data: [DONE]" {
                                return;
                            }
                            if let Some(data) = line.strip_prefix("data: ") {
                                if let Ok(json) = serde_json::from_str::<Value>(data) {
                                    if let Some(content) =
                                        json["choices"][0]["delta"]["content"].as_str()
                                    {
                                        if !content.is_empty()
                                            && tx.send(Ok(content.to_string())).await.is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(ApiError::CompletionService(e.to_string())))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::EmbeddingService(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::EmbeddingService(format!(
                "embedding request failed with {status}: {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ApiError::EmbeddingService(e.to_string()))?;

        let data = payload["data"].as_array().ok_or_else(|| {
            ApiError::EmbeddingService("embedding response missing data array".to_string())
        })?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let values = item["embedding"].as_array().ok_or_else(|| {
                ApiError::EmbeddingService("embedding response entry missing vector".to_string())
            })?;
            let vector: Vec<f32> = values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vector);
        }

        Ok(embeddings)
    }
}
