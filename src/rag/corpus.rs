use std::fs;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::index::FlatIndex;
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

/// Provenance record for one chunk. `id` is dense, zero-based, assigned in
/// ingestion order, and equals the chunk's row in the vector index. The
/// chunk text itself is not stored; it is re-read from `source` on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub id: usize,
    pub title: String,
    pub source: String,
}

/// One complete (index, metadata) pair produced by a single ingestion run.
/// Metadata entry `i` always describes index row `i`.
#[derive(Debug)]
pub struct CorpusGeneration {
    index: FlatIndex,
    meta: Vec<ChunkMeta>,
}

impl CorpusGeneration {
    pub fn new(index: FlatIndex, meta: Vec<ChunkMeta>) -> Result<Self, ApiError> {
        if index.len() != meta.len() {
            return Err(ApiError::Internal(format!(
                "index has {} rows but metadata has {} entries",
                index.len(),
                meta.len()
            )));
        }
        Ok(Self { index, meta })
    }

    pub fn empty(dim: usize) -> Self {
        Self {
            index: FlatIndex::empty(dim),
            meta: Vec::new(),
        }
    }

    /// Loads the persisted generation, or an empty one when no artifacts
    /// exist yet. Artifacts that exist but cannot be parsed are an error.
    pub fn load(paths: &AppPaths, dim: usize) -> Result<Self, ApiError> {
        if !paths.index_path.exists() || !paths.meta_path.exists() {
            return Ok(Self::empty(dim));
        }

        let index = FlatIndex::load(&paths.index_path)?;
        let raw = fs::read_to_string(&paths.meta_path).map_err(ApiError::internal)?;
        let meta: Vec<ChunkMeta> = serde_json::from_str(&raw).map_err(ApiError::internal)?;
        Self::new(index, meta)
    }

    /// Rewrites both artifacts wholesale.
    pub fn persist(&self, paths: &AppPaths) -> Result<(), ApiError> {
        self.index.save(&paths.index_path)?;
        let json = serde_json::to_string_pretty(&self.meta).map_err(ApiError::internal)?;
        fs::write(&paths.meta_path, json).map_err(ApiError::internal)
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn meta(&self) -> &[ChunkMeta] {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}

/// Swappable handle to the current corpus generation. Readers clone the
/// inner `Arc` and keep a fully consistent (index, metadata) pair even while
/// an ingestion run swaps in a replacement.
#[derive(Clone)]
pub struct CorpusHandle {
    inner: Arc<RwLock<Arc<CorpusGeneration>>>,
}

impl CorpusHandle {
    pub fn new(generation: CorpusGeneration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(generation))),
        }
    }

    pub async fn current(&self) -> Arc<CorpusGeneration> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, generation: CorpusGeneration) {
        *self.inner.write().await = Arc::new(generation);
    }
}
