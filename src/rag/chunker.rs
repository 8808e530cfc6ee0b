use crate::core::errors::ApiError;

/// Splits document text into fixed-size overlapping segments, counted in
/// characters. Purely positional; no sentence or paragraph awareness.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ApiError> {
        if chunk_size == 0 {
            return Err(ApiError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ApiError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Lazy iterator over the chunks of `text`. Each call starts over from
    /// offset zero.
    pub fn chunks(&self, text: &str) -> Chunks {
        Chunks {
            chars: text.chars().collect(),
            offset: 0,
            chunk_size: self.chunk_size,
            step: self.chunk_size - self.overlap,
        }
    }
}

pub struct Chunks {
    chars: Vec<char>,
    offset: usize,
    chunk_size: usize,
    step: usize,
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.offset >= self.chars.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.chars.len());
        let chunk: String = self.chars[self.offset..end].iter().collect();
        self.offset += self.step;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hundred_chars_yield_three_chunks() {
        let text = "a".repeat(1200);
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks: Vec<String> = chunker.chunks(&text).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(chunks[1].chars().count(), 500);
        // offsets 0, 450, 900; the last chunk runs to the end of the text
        assert_eq!(chunks[2].chars().count(), 300);
    }

    #[test]
    fn consecutive_chunks_share_the_overlap() {
        let text: String = ('a'..='z').cycle().take(120).collect();
        let chunker = Chunker::new(50, 10).unwrap();
        let chunks: Vec<String> = chunker.chunks(&text).collect();

        assert_eq!(chunks.len(), 3);
        let tail: String = chunks[0].chars().skip(40).collect();
        let head: String = chunks[1].chars().take(10).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn step_prefixes_reconstruct_the_source() {
        let text: String = ('a'..='z').cycle().take(900).collect();
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks: Vec<String> = chunker.chunks(&text).collect();

        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 < chunks.len() {
                rebuilt.extend(chunk.chars().take(450));
            } else {
                rebuilt.push_str(chunk);
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn short_text_yields_a_single_chunk() {
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks: Vec<String> = chunker.chunks("tiny").collect();
        assert_eq!(chunks, vec!["tiny".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = Chunker::new(500, 50).unwrap();
        assert_eq!(chunker.chunks("").count(), 0);
    }

    #[test]
    fn iteration_is_restartable() {
        let text = "x".repeat(1000);
        let chunker = Chunker::new(300, 100).unwrap();
        let first: Vec<String> = chunker.chunks(&text).collect();
        let second: Vec<String> = chunker.chunks(&text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_text_splits_on_character_boundaries() {
        let text = "héllo wörld ☃".repeat(40);
        let chunker = Chunker::new(100, 20).unwrap();
        let chunks: Vec<String> = chunker.chunks(&text).collect();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        let rebuilt_len: usize = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i + 1 < chunks.len() {
                    80
                } else {
                    c.chars().count()
                }
            })
            .sum();
        assert_eq!(rebuilt_len, text.chars().count());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            Chunker::new(100, 100),
            Err(ApiError::Configuration(_))
        ));
        assert!(matches!(
            Chunker::new(100, 150),
            Err(ApiError::Configuration(_))
        ));
        assert!(matches!(Chunker::new(0, 0), Err(ApiError::Configuration(_))));
    }

    #[test]
    fn zero_overlap_partitions_the_text() {
        let text = "a".repeat(1000);
        let chunker = Chunker::new(250, 0).unwrap();
        let chunks: Vec<String> = chunker.chunks(&text).collect();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() == 250));
    }
}
