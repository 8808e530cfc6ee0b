use std::env;

use crate::core::errors::ApiError;

/// Sampling parameters sent with every completion call.
pub const LLM_TEMPERATURE: f64 = 0.1;
pub const LLM_MAX_TOKENS: u32 = 4096;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Provider endpoints and credentials, resolved from the environment at
/// startup. Embedding values fall back to the completion ones so a single
/// OpenAI-compatible gateway can serve both roles.
#[derive(Debug, Clone)]
pub struct Settings {
    pub completion_base_url: String,
    pub completion_api_key: String,
    pub completion_model: String,
    pub embedding_base_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ApiError> {
        let completion_api_key = require_env("PAGESENSE_COMPLETION_API_KEY")?;
        let completion_base_url = env::var("PAGESENSE_COMPLETION_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let completion_model = env::var("PAGESENSE_COMPLETION_MODEL")
            .unwrap_or_else(|_| DEFAULT_COMPLETION_MODEL.to_string());

        let embedding_api_key = env::var("PAGESENSE_EMBEDDING_API_KEY")
            .unwrap_or_else(|_| completion_api_key.clone());
        let embedding_base_url = env::var("PAGESENSE_EMBEDDING_BASE_URL")
            .unwrap_or_else(|_| completion_base_url.clone());
        let embedding_model = env::var("PAGESENSE_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        Ok(Settings {
            completion_base_url,
            completion_api_key,
            completion_model,
            embedding_base_url,
            embedding_api_key,
            embedding_model,
        })
    }
}

fn require_env(key: &str) -> Result<String, ApiError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::Configuration(format!("{key} must be set")))
}
