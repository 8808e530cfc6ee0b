use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunker::Chunker;
use super::corpus::{ChunkMeta, CorpusGeneration, CorpusHandle};
use super::embedding::EmbeddingClient;
use super::index::FlatIndex;
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

/// Rebuilds the corpus representation from a directory of documents:
/// chunk -> embed -> index -> persist -> swap. Destructive and
/// non-incremental; the prior generation is discarded in full.
#[derive(Clone)]
pub struct IngestionPipeline {
    embedder: EmbeddingClient,
    corpus: CorpusHandle,
    paths: Arc<AppPaths>,
}

impl IngestionPipeline {
    pub fn new(embedder: EmbeddingClient, corpus: CorpusHandle, paths: Arc<AppPaths>) -> Self {
        Self {
            embedder,
            corpus,
            paths,
        }
    }

    pub async fn ingest(
        &self,
        docs_dir: &Path,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize, ApiError> {
        let chunker = Chunker::new(chunk_size, overlap)?;
        let files = list_document_files(docs_dir)?;

        let mut chunks: Vec<String> = Vec::new();
        let mut meta: Vec<ChunkMeta> = Vec::new();
        for path in &files {
            let text = fs::read_to_string(path).map_err(|e| {
                ApiError::Internal(format!("failed to read {}: {e}", path.display()))
            })?;
            let title = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            for chunk in chunker.chunks(&text) {
                meta.push(ChunkMeta {
                    id: meta.len(),
                    title: title.clone(),
                    source: path.display().to_string(),
                });
                chunks.push(chunk);
            }
        }

        let vectors = self.embedder.embed(&chunks).await?;
        let index = FlatIndex::build(self.embedder.dim(), vectors)?;
        let generation = CorpusGeneration::new(index, meta)?;
        generation.persist(&self.paths)?;

        let num_chunks = generation.len();
        self.corpus.replace(generation).await;

        tracing::info!(
            num_chunks,
            files = files.len(),
            docs_dir = %docs_dir.display(),
            "corpus generation rebuilt"
        );
        Ok(num_chunks)
    }
}

/// Plain-text and markdown files directly under `dir`, sorted by path so
/// chunk ids are reproducible across runs. No recursion.
fn list_document_files(dir: &Path) -> Result<Vec<PathBuf>, ApiError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ApiError::NoDocumentsFound(format!("cannot read {}: {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ApiError::NoDocumentsFound(format!(
            "no .txt or .md files in {}",
            dir.display()
        )));
    }
    Ok(files)
}
