use std::fs;

use serde::Deserialize;

use super::corpus::{ChunkMeta, CorpusGeneration, CorpusHandle};
use super::embedding::EmbeddingClient;
use crate::core::errors::ApiError;

/// Trimmed page content must exceed this many characters before the page is
/// treated as the primary context source.
pub const WEBPAGE_CONTENT_THRESHOLD: usize = 50;

/// Retrieval depth in webpage-primary mode; the page carries the answer, the
/// corpus only supplements it.
const SUPPLEMENTARY_TOP_K: usize = 2;

const SUPPLEMENTARY_EXCERPT_CHARS: usize = 300;
const KNOWLEDGE_BASE_EXCERPT_CHARS: usize = 500;
const MAX_CODE_BLOCKS: usize = 5;
const MAX_IMAGES: usize = 3;
const MAX_VIDEOS: usize = 3;

pub const WEBPAGE_SYSTEM_PROMPT: &str = "You are a helpful and conversational AI assistant that answers questions about webpages in a natural, human-friendly way. \
Format your responses using proper Markdown for better readability - use headers (##), bullet points (-), **bold text**, code blocks (```), and other Markdown formatting. \
PRIORITIZE the webpage content provided above all other sources. Use the supplementary knowledge base only if the webpage content doesn't contain the answer. \
When relevant to the user's question, include and reference code blocks, images, or videos from the webpage. \
For code blocks, use proper syntax highlighting with language tags (```javascript, ```python, etc.). \
For images, describe them and mention their purpose when relevant. \
For videos, reference their titles and content when applicable. \
Structure your answers clearly with appropriate headings and bullet points for easy reading. \
Keep your tone conversational and helpful, like ChatGPT would respond, but use Markdown formatting for better presentation.";

pub const KNOWLEDGE_BASE_SYSTEM_PROMPT: &str = "You are a helpful and conversational AI assistant that answers questions using the provided knowledge base. \
Format your responses using proper Markdown for better readability - use headers (##), bullet points (-), **bold text**, and other Markdown formatting. \
Structure your answers clearly with appropriate headings and bullet points for easy reading. \
Use the context provided below and do NOT hallucinate facts. If the answer is not in the context, say you don't know and optionally give general guidance. \
Keep your tone conversational and helpful, like ChatGPT would respond, but use Markdown formatting for better presentation.";

/// Snapshot of the webpage the user is viewing, scraped by the extension.
/// Request-scoped; never persisted. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub content: String,
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "codeBlocks")]
    pub code_blocks: Vec<CodeBlock>,
    pub images: Vec<ImageRef>,
    pub videos: Vec<VideoRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub context: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub src: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoRef {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub src: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub page_context: PageContext,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    4
}

/// Everything the answer orchestrator needs: the rendered context, the
/// system prompt for the selected mode, and the metadata of every chunk
/// actually used (possibly empty in webpage-primary mode).
#[derive(Debug)]
pub struct AssembledContext {
    pub context: String,
    pub system_prompt: &'static str,
    pub retrieved: Vec<ChunkMeta>,
}

/// Decides the context source for a request, performs retrieval when
/// needed, and renders the prompt context string.
#[derive(Clone)]
pub struct ContextAssembler {
    embedder: EmbeddingClient,
    corpus: CorpusHandle,
}

impl ContextAssembler {
    pub fn new(embedder: EmbeddingClient, corpus: CorpusHandle) -> Self {
        Self { embedder, corpus }
    }

    pub async fn assemble(&self, request: &ChatRequest) -> Result<AssembledContext, ApiError> {
        let content = request.page_context.content.trim();
        if content.chars().count() > WEBPAGE_CONTENT_THRESHOLD {
            Ok(self.assemble_webpage(request, content).await)
        } else {
            self.assemble_knowledge_base(request).await
        }
    }

    /// Webpage-primary mode: the page is the main source, the corpus is
    /// best-effort supplementary material.
    async fn assemble_webpage(&self, request: &ChatRequest, content: &str) -> AssembledContext {
        let page = &request.page_context;
        let mut parts: Vec<String> = Vec::new();

        parts.push("=== CURRENT WEBPAGE CONTENT ===".to_string());
        parts.push(format!(
            "Title: {}",
            page.title.as_deref().unwrap_or("Current Webpage")
        ));
        parts.push(format!("URL: {}", page.url.as_deref().unwrap_or("")));
        parts.push(format!("Content: {content}"));

        if !page.code_blocks.is_empty() {
            parts.push(format!(
                "\n=== CODE BLOCKS ON PAGE ({} found) ===",
                page.code_blocks.len()
            ));
            for (i, block) in page.code_blocks.iter().take(MAX_CODE_BLOCKS).enumerate() {
                parts.push(format!(
                    "Code Block {} ({}):",
                    i + 1,
                    block.language.as_deref().unwrap_or("text")
                ));
                parts.push(format!(
                    "Context: {}",
                    block.context.as_deref().unwrap_or("No context")
                ));
                parts.push(format!("Code:\n{}\n---", block.code.as_deref().unwrap_or("")));
            }
        }

        if !page.images.is_empty() {
            parts.push(format!(
                "\n=== IMAGES ON PAGE ({} found) ===",
                page.images.len()
            ));
            for (i, image) in page.images.iter().take(MAX_IMAGES).enumerate() {
                parts.push(format!("Image {}:", i + 1));
                parts.push(format!(
                    "Alt text: {}",
                    image.alt.as_deref().unwrap_or("No alt text")
                ));
                parts.push(format!(
                    "Caption: {}",
                    image.caption.as_deref().unwrap_or("No caption")
                ));
                parts.push(format!(
                    "Source: {}",
                    image.src.as_deref().unwrap_or("No source")
                ));
                parts.push(format!(
                    "Context: {}\n---",
                    image.context.as_deref().unwrap_or("No context")
                ));
            }
        }

        if !page.videos.is_empty() {
            parts.push(format!(
                "\n=== VIDEOS ON PAGE ({} found) ===",
                page.videos.len()
            ));
            for (i, video) in page.videos.iter().take(MAX_VIDEOS).enumerate() {
                parts.push(format!("Video {}:", i + 1));
                parts.push(format!(
                    "Title: {}",
                    video.title.as_deref().unwrap_or("No title")
                ));
                parts.push(format!(
                    "Caption: {}",
                    video.caption.as_deref().unwrap_or("No caption")
                ));
                parts.push(format!(
                    "Source: {}",
                    video.src.as_deref().unwrap_or("No source")
                ));
                parts.push(format!(
                    "Context: {}\n---",
                    video.context.as_deref().unwrap_or("No context")
                ));
            }
        }

        parts.push("=== END WEBPAGE CONTENT ===\n".to_string());

        let mut retrieved = Vec::new();
        let corpus = self.corpus.current().await;
        if !corpus.is_empty() {
            let k = request.top_k.min(SUPPLEMENTARY_TOP_K);
            match self.retrieve(&request.query, k, &corpus).await {
                Ok(hits) => {
                    parts.push("=== SUPPLEMENTARY KNOWLEDGE BASE ===".to_string());
                    for meta in &hits {
                        let excerpt = read_excerpt(&meta.source, SUPPLEMENTARY_EXCERPT_CHARS);
                        parts.push(format!("Title: {}\nExcerpt: {excerpt}\n---", meta.title));
                    }
                    parts.push("=== END KNOWLEDGE BASE ===".to_string());
                    retrieved = hits;
                }
                Err(err) => {
                    // best-effort enrichment; the page content still answers
                    tracing::warn!(error = %err, "supplementary retrieval failed");
                }
            }
        }

        AssembledContext {
            context: parts.join("\n"),
            system_prompt: WEBPAGE_SYSTEM_PROMPT,
            retrieved,
        }
    }

    /// Knowledge-base mode: the corpus is the only source and must exist.
    async fn assemble_knowledge_base(
        &self,
        request: &ChatRequest,
    ) -> Result<AssembledContext, ApiError> {
        let corpus = self.corpus.current().await;
        if corpus.is_empty() {
            return Err(ApiError::IndexNotReady(
                "no webpage content available and the document corpus is empty; \
                 call /ingest first or open a page"
                    .to_string(),
            ));
        }

        let hits = self.retrieve(&request.query, request.top_k, &corpus).await?;
        let parts: Vec<String> = hits
            .iter()
            .map(|meta| {
                let excerpt = read_excerpt(&meta.source, KNOWLEDGE_BASE_EXCERPT_CHARS);
                format!("Title: {}\nExcerpt: {excerpt}\n---\n", meta.title)
            })
            .collect();

        Ok(AssembledContext {
            context: parts.join("\n"),
            system_prompt: KNOWLEDGE_BASE_SYSTEM_PROMPT,
            retrieved: hits,
        })
    }

    async fn retrieve(
        &self,
        query: &str,
        k: usize,
        corpus: &CorpusGeneration,
    ) -> Result<Vec<ChunkMeta>, ApiError> {
        let query_vector = self.embedder.embed_query(query).await?;
        let hits = corpus.index().search(&query_vector, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(row, _score)| corpus.meta().get(row).cloned())
            .collect())
    }
}

/// User prompt shared by both modes.
pub fn build_user_prompt(request: &ChatRequest, context: &str) -> String {
    let page = &request.page_context;
    let page_info = format!(
        "Page: {} ({})",
        page.title.as_deref().unwrap_or("Unknown"),
        page.url.as_deref().unwrap_or("No URL")
    );
    format!(
        "Page Info: {page_info}\n\nContext:\n{context}\n\nQuestion: {}",
        request.query
    )
}

/// First `max_chars` characters of the chunk's source file, newlines
/// flattened. An unreadable source degrades to an empty excerpt; the
/// request must still complete.
fn read_excerpt(source: &str, max_chars: usize) -> String {
    match read_source_excerpt(source, max_chars) {
        Ok(excerpt) => excerpt,
        Err(err) => {
            tracing::warn!(source, error = %err, "failed to read chunk source for excerpt");
            String::new()
        }
    }
}

fn read_source_excerpt(source: &str, max_chars: usize) -> Result<String, ApiError> {
    let text = fs::read_to_string(source)
        .map_err(|e| ApiError::SourceUnreadable(format!("{source}: {e}")))?;
    let excerpt: String = text.chars().take(max_chars).collect();
    Ok(excerpt.replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockEmbedder;
    use crate::rag::index::FlatIndex;
    use ndarray::Array2;
    use std::path::Path;
    use std::sync::Arc;

    const DIM: usize = 4;

    fn request(query: &str, content: &str, top_k: usize) -> ChatRequest {
        ChatRequest {
            query: query.to_string(),
            page_context: PageContext {
                content: content.to_string(),
                ..PageContext::default()
            },
            top_k,
        }
    }

    /// Corpus whose row `i` is the unit basis vector `e_i`, with one source
    /// file per chunk. A query of `i` characters then matches row `i`
    /// exactly (the mock embedder maps length -> basis vector).
    fn corpus_with_sources(dir: &Path, rows: usize) -> CorpusHandle {
        let mut flat = vec![0.0_f32; rows * DIM];
        let mut meta = Vec::new();
        for i in 0..rows {
            flat[i * DIM + (i % DIM)] = 1.0;
            let source = dir.join(format!("doc{i}.txt"));
            fs::write(&source, format!("contents of document {i}\nsecond line")).unwrap();
            meta.push(ChunkMeta {
                id: i,
                title: format!("doc{i}.txt"),
                source: source.display().to_string(),
            });
        }
        let vectors = Array2::from_shape_vec((rows, DIM), flat).unwrap();
        let index = FlatIndex::build(DIM, vectors).unwrap();
        CorpusHandle::new(CorpusGeneration::new(index, meta).unwrap())
    }

    fn assembler(corpus: CorpusHandle) -> (ContextAssembler, MockEmbedder) {
        let mock = MockEmbedder::new(DIM);
        let embedder = EmbeddingClient::with_dim(Arc::new(mock.clone()), DIM);
        (ContextAssembler::new(embedder, corpus), mock)
    }

    #[tokio::test]
    async fn content_of_fifty_one_chars_selects_webpage_mode() {
        let (assembler, _) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let req = request("q", &"c".repeat(51), 4);
        let assembled = assembler.assemble(&req).await.unwrap();
        assert_eq!(assembled.system_prompt, WEBPAGE_SYSTEM_PROMPT);
        assert!(assembled.context.contains("=== CURRENT WEBPAGE CONTENT ==="));
    }

    #[tokio::test]
    async fn content_of_fifty_chars_falls_back_to_knowledge_base() {
        let (assembler, _) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let req = request("q", &"c".repeat(50), 4);
        let err = assembler.assemble(&req).await.unwrap_err();
        assert!(matches!(err, ApiError::IndexNotReady(_)));
    }

    #[tokio::test]
    async fn whitespace_padding_does_not_flip_the_mode() {
        let (assembler, _) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let padded = format!("   {}   \n", "c".repeat(50));
        let err = assembler.assemble(&request("q", &padded, 4)).await.unwrap_err();
        assert!(matches!(err, ApiError::IndexNotReady(_)));
    }

    #[tokio::test]
    async fn empty_corpus_fails_without_calling_the_embedder() {
        let (assembler, mock) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let err = assembler.assemble(&request("q", "", 4)).await.unwrap_err();
        assert!(matches!(err, ApiError::IndexNotReady(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn knowledge_base_mode_retrieves_top_k_with_excerpts() {
        let dir = tempfile::tempdir().unwrap();
        let (assembler, _) = assembler(corpus_with_sources(dir.path(), 3));

        // two-char query -> basis vector e2 -> row 2 ranks first
        let assembled = assembler.assemble(&request("qq", "", 2)).await.unwrap();
        assert_eq!(assembled.system_prompt, KNOWLEDGE_BASE_SYSTEM_PROMPT);
        assert_eq!(assembled.retrieved.len(), 2);
        assert_eq!(assembled.retrieved[0].id, 2);
        assert!(assembled.context.contains("Title: doc2.txt"));
        // newlines in the source are flattened into the excerpt
        assert!(assembled.context.contains("contents of document 2 second line"));
    }

    #[tokio::test]
    async fn webpage_mode_caps_supplementary_retrieval_at_two() {
        let dir = tempfile::tempdir().unwrap();
        let (assembler, _) = assembler(corpus_with_sources(dir.path(), 4));

        let req = request("q", &"c".repeat(100), 4);
        let assembled = assembler.assemble(&req).await.unwrap();
        assert_eq!(assembled.retrieved.len(), 2);
        assert!(assembled
            .context
            .contains("=== SUPPLEMENTARY KNOWLEDGE BASE ==="));
    }

    #[tokio::test]
    async fn webpage_mode_swallows_supplementary_failures() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = corpus_with_sources(dir.path(), 2);
        let mock = MockEmbedder::failing(DIM);
        let embedder = EmbeddingClient::with_dim(Arc::new(mock), DIM);
        let assembler = ContextAssembler::new(embedder, corpus);

        let req = request("q", &"c".repeat(100), 4);
        let assembled = assembler.assemble(&req).await.unwrap();
        assert!(assembled.retrieved.is_empty());
        assert!(assembled.context.contains("=== CURRENT WEBPAGE CONTENT ==="));
        assert!(!assembled.context.contains("SUPPLEMENTARY"));
    }

    #[tokio::test]
    async fn webpage_mode_skips_retrieval_when_corpus_is_empty() {
        let (assembler, mock) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let req = request("q", &"c".repeat(100), 4);
        let assembled = assembler.assemble(&req).await.unwrap();
        assert!(assembled.retrieved.is_empty());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn missing_source_degrades_to_empty_excerpt() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = corpus_with_sources(dir.path(), 1);
        fs::remove_file(dir.path().join("doc0.txt")).unwrap();
        let (assembler, _) = assembler(corpus);

        let assembled = assembler.assemble(&request("", "", 1)).await.unwrap();
        assert_eq!(assembled.retrieved.len(), 1);
        assert!(assembled.context.contains("Title: doc0.txt\nExcerpt: \n---"));
    }

    #[tokio::test]
    async fn webpage_mode_renders_media_with_placeholders() {
        let (assembler, _) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let mut req = request("q", &"c".repeat(100), 4);
        req.page_context.title = Some("Docs".to_string());
        req.page_context.url = Some("https://example.com/docs".to_string());
        req.page_context.code_blocks = vec![CodeBlock {
            language: Some("rust".to_string()),
            context: None,
            code: Some("fn main() {}".to_string()),
        }];
        req.page_context.images = vec![ImageRef::default()];
        req.page_context.videos = vec![VideoRef::default()];

        let assembled = assembler.assemble(&req).await.unwrap();
        assert!(assembled.context.contains("Title: Docs"));
        assert!(assembled.context.contains("URL: https://example.com/docs"));
        assert!(assembled.context.contains("Code Block 1 (rust):"));
        assert!(assembled.context.contains("Context: No context"));
        assert!(assembled.context.contains("Alt text: No alt text"));
        assert!(assembled.context.contains("Title: No title"));
    }

    #[tokio::test]
    async fn webpage_mode_limits_code_blocks_to_five() {
        let (assembler, _) = assembler(CorpusHandle::new(CorpusGeneration::empty(DIM)));
        let mut req = request("q", &"c".repeat(100), 4);
        req.page_context.code_blocks = (0..8).map(|_| CodeBlock::default()).collect();

        let assembled = assembler.assemble(&req).await.unwrap();
        assert!(assembled.context.contains("=== CODE BLOCKS ON PAGE (8 found) ==="));
        assert!(assembled.context.contains("Code Block 5 (text):"));
        assert!(!assembled.context.contains("Code Block 6"));
    }

    #[test]
    fn user_prompt_includes_page_info_context_and_question() {
        let req = request("what is this?", "", 4);
        let prompt = build_user_prompt(&req, "CONTEXT");
        assert_eq!(
            prompt,
            "Page Info: Page: Unknown (No URL)\n\nContext:\nCONTEXT\n\nQuestion: what is this?"
        );
    }

    #[test]
    fn chat_request_defaults_apply() {
        let req: ChatRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(req.top_k, 4);
        assert!(req.page_context.content.is_empty());

        let req: ChatRequest = serde_json::from_str(
            r#"{"query": "hi", "page_context": {"content": "text", "codeBlocks": [{"language": "js"}]}, "top_k": 7}"#,
        )
        .unwrap();
        assert_eq!(req.top_k, 7);
        assert_eq!(req.page_context.code_blocks.len(), 1);
    }
}
