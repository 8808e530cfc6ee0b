use std::sync::Arc;

use ndarray::Array2;

use crate::core::errors::ApiError;
use crate::llm::Embedder;

/// Dimension of the embedding model's output vectors.
pub const EMBED_DIM: usize = 3072;

/// Provider request-size limit; inputs are grouped, never reordered.
const EMBED_BATCH_SIZE: usize = 20;

/// Adapter over an [`Embedder`] that batches provider calls, validates the
/// returned shape, and L2-normalizes every vector so inner product equals
/// cosine similarity downstream.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn Embedder>,
    dim: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn Embedder>) -> Self {
        Self::with_dim(provider, EMBED_DIM)
    }

    pub fn with_dim(provider: Arc<dyn Embedder>, dim: usize) -> Self {
        Self { provider, dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds `texts` into a `(texts.len(), dim)` matrix of unit rows.
    pub async fn embed(&self, texts: &[String]) -> Result<Array2<f32>, ApiError> {
        let mut flat = Vec::with_capacity(texts.len() * self.dim);
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let vectors = self.provider.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::EmbeddingService(format!(
                    "provider returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            for vector in vectors {
                if vector.len() != self.dim {
                    return Err(ApiError::EmbeddingService(format!(
                        "provider returned a {}-dimensional vector, expected {}",
                        vector.len(),
                        self.dim
                    )));
                }
                flat.extend(vector);
            }
        }

        let mut matrix =
            Array2::from_shape_vec((texts.len(), self.dim), flat).map_err(ApiError::internal)?;
        l2_normalize_rows(&mut matrix);
        Ok(matrix)
    }

    /// Embeds a single query and returns the normalized vector.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let texts = [text.to_string()];
        let matrix = self.embed(&texts).await?;
        Ok(matrix.row(0).to_vec())
    }
}

/// Scales each row to unit length. Zero rows are left as-is (norm treated
/// as 1.0) so they never produce NaN.
pub fn l2_normalize_rows(matrix: &mut Array2<f32>) {
    for mut row in matrix.rows_mut() {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
}
