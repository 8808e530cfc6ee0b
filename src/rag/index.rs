use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::core::errors::ApiError;

/// Exact-search flat index over unit-normalized vectors. Similarity is the
/// inner product, which equals cosine similarity because both stored and
/// query vectors are unit length.
#[derive(Debug)]
pub struct FlatIndex {
    dim: usize,
    vectors: Array2<f32>,
}

impl FlatIndex {
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            vectors: Array2::zeros((0, dim)),
        }
    }

    /// Replaces all prior content with `vectors`.
    pub fn build(dim: usize, vectors: Array2<f32>) -> Result<Self, ApiError> {
        if vectors.nrows() > 0 && vectors.ncols() != dim {
            return Err(ApiError::Internal(format!(
                "index expects {dim}-dimensional vectors, got {}",
                vectors.ncols()
            )));
        }
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    /// Scores every stored vector against `query` and returns the top
    /// `min(k, len)` rows as `(row, score)`, sorted by descending score with
    /// ties broken by ascending row so results are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, ApiError> {
        if self.is_empty() {
            return Err(ApiError::IndexNotReady(
                "vector index is empty; ingest documents first".to_string(),
            ));
        }
        if query.len() != self.dim {
            return Err(ApiError::Internal(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dim
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let q = Array1::from_vec(query.to_vec());
        let scores = self.vectors.dot(&q);

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        order.truncate(k.min(self.len()));

        Ok(order.into_iter().map(|row| (row, scores[row])).collect())
    }

    /// Writes the snapshot: `[rows: u32 LE][dim: u32 LE]` then row-major
    /// `f32` LE payload.
    pub fn save(&self, path: &Path) -> Result<(), ApiError> {
        let rows = self.len() as u32;
        let dim = self.dim as u32;

        let mut bytes = Vec::with_capacity(8 + self.vectors.len() * 4);
        bytes.extend_from_slice(&rows.to_le_bytes());
        bytes.extend_from_slice(&dim.to_le_bytes());
        for value in self.vectors.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        fs::write(path, bytes).map_err(ApiError::internal)
    }

    /// Reads a snapshot written by [`FlatIndex::save`]. A malformed file is
    /// an error; a missing file is the caller's concern.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let bytes = fs::read(path).map_err(ApiError::internal)?;
        if bytes.len() < 8 {
            return Err(ApiError::Internal(format!(
                "index snapshot {} is truncated",
                path.display()
            )));
        }

        let rows = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let dim = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let expected = 8 + rows * dim * 4;
        if bytes.len() != expected {
            return Err(ApiError::Internal(format!(
                "index snapshot {} has {} bytes, expected {expected}",
                path.display(),
                bytes.len()
            )));
        }

        let values: Vec<f32> = bytes[8..]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let vectors = Array2::from_shape_vec((rows, dim), values).map_err(ApiError::internal)?;

        Ok(Self { dim, vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn unit_index() -> FlatIndex {
        let vectors = array![
            [1.0_f32, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
        ];
        FlatIndex::build(3, vectors).unwrap()
    }

    #[test]
    fn search_ranks_by_descending_score() {
        let vectors = array![[0.8_f32, 0.6], [1.0, 0.0], [0.6, 0.8]];
        let index = FlatIndex::build(2, vectors).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 0);
        assert_eq!(hits[2].0, 2);
        assert!(hits[0].1 >= hits[1].1 && hits[1].1 >= hits[2].1);
    }

    #[test]
    fn equal_scores_order_by_ascending_row() {
        let index = unit_index();
        // rows 0 and 3 both score 1.0 against this query
        let hits = index.search(&[1.0, 0.0, 0.0], 4).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 3);
    }

    #[test]
    fn repeated_searches_are_identical() {
        let index = unit_index();
        let first = index.search(&[0.5, 0.5, 0.0], 4).unwrap();
        let second = index.search(&[0.5, 0.5, 0.0], 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn k_is_clamped_to_index_size() {
        let index = unit_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn zero_k_yields_empty_result() {
        let index = unit_index();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn searching_an_empty_index_fails() {
        let index = FlatIndex::empty(3);
        let err = index.search(&[1.0, 0.0, 0.0], 2).unwrap_err();
        assert!(matches!(err, ApiError::IndexNotReady(_)));
    }

    #[test]
    fn snapshot_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");

        let index = unit_index();
        index.save(&path).unwrap();

        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.dim(), 3);
        assert_eq!(
            loaded.search(&[0.0, 1.0, 0.0], 1).unwrap(),
            index.search(&[0.0, 1.0, 0.0], 1).unwrap()
        );
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");

        FlatIndex::empty(3).save(&path).unwrap();
        let loaded = FlatIndex::load(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dim(), 3);
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.bin");
        std::fs::write(&path, [1, 2, 3]).unwrap();
        assert!(FlatIndex::load(&path).is_err());
    }
}
