//! Retrieval-augmented generation core: chunking, embedding, exact vector
//! search, corpus lifecycle, context assembly, and answer orchestration.

pub mod answer;
pub mod chunker;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod ingest;

pub use answer::{AnswerService, StreamEvent};
pub use chunker::Chunker;
pub use context::{ChatRequest, ContextAssembler, PageContext};
pub use corpus::{ChunkMeta, CorpusGeneration, CorpusHandle};
pub use embedding::{EmbeddingClient, EMBED_DIM};
pub use index::FlatIndex;
pub use ingest::IngestionPipeline;
