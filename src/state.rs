use std::sync::Arc;

use crate::core::config::settings::{LLM_MAX_TOKENS, LLM_TEMPERATURE};
use crate::core::config::{AppPaths, Settings};
use crate::llm::{Completer, Embedder, OpenAiClient};
use crate::rag::{
    AnswerService, ContextAssembler, CorpusGeneration, CorpusHandle, EmbeddingClient,
    IngestionPipeline, EMBED_DIM,
};

/// Global application state shared across all routes. Holds the swappable
/// corpus handle plus the services built around the provider clients.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub corpus: CorpusHandle,
    pub pipeline: IngestionPipeline,
    pub assembler: ContextAssembler,
    pub answerer: AnswerService,
}

impl AppState {
    /// Wires the production state: paths and provider credentials from the
    /// environment, corpus loaded from the persisted artifacts if present.
    pub fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env()?;

        let completer: Arc<dyn Completer> = Arc::new(OpenAiClient::new(
            settings.completion_base_url.clone(),
            settings.completion_api_key.clone(),
            settings.completion_model.clone(),
        ));
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiClient::new(
            settings.embedding_base_url.clone(),
            settings.embedding_api_key.clone(),
            settings.embedding_model.clone(),
        ));

        Ok(Self::with_providers(paths, embedder, completer))
    }

    /// Assembles the state around arbitrary provider implementations.
    pub fn with_providers(
        paths: Arc<AppPaths>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Arc<Self> {
        let generation = match CorpusGeneration::load(&paths, EMBED_DIM) {
            Ok(generation) => {
                if !generation.is_empty() {
                    tracing::info!(num_chunks = generation.len(), "loaded persisted corpus");
                }
                generation
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load persisted corpus; starting empty");
                CorpusGeneration::empty(EMBED_DIM)
            }
        };
        let corpus = CorpusHandle::new(generation);

        let embedding = EmbeddingClient::new(embedder);
        let pipeline = IngestionPipeline::new(embedding.clone(), corpus.clone(), paths.clone());
        let assembler = ContextAssembler::new(embedding, corpus.clone());
        let answerer = AnswerService::new(completer, LLM_TEMPERATURE, LLM_MAX_TOKENS);

        Arc::new(AppState {
            paths,
            corpus,
            pipeline,
            assembler,
            answerer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{MockCompleter, MockEmbedder};

    #[tokio::test]
    async fn corrupt_artifacts_fall_back_to_an_empty_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(tmp.path().to_path_buf()));
        std::fs::write(&paths.index_path, "garbage").unwrap();
        std::fs::write(&paths.meta_path, "garbage").unwrap();

        let state = AppState::with_providers(
            paths,
            Arc::new(MockEmbedder::new(EMBED_DIM)),
            Arc::new(MockCompleter::with_reply("ok")),
        );
        assert!(state.corpus.current().await.is_empty());
    }
}
