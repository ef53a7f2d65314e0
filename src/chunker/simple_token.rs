//! Whitespace-based token-like chunker.

use super::model::{Chunk, ChunkingOptions};
use super::protocols::Chunker;

/// Splits text on whitespace into fixed-size token windows with overlap.
///
/// TODO: replace with a real tokenizer integration (tiktoken/HF) once one
/// is available to this crate.
#[derive(Debug, Default)]
pub struct SimpleTokenChunker;

impl SimpleTokenChunker {
    /// Creates a new chunker instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Chunker for SimpleTokenChunker {
    fn chunker_id(&self) -> &str {
        "simple_token_like@v1"
    }

    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let max_tokens = options.max_chunk_tokens.unwrap_or(200).max(1);
        let overlap = options.overlap_tokens.unwrap_or(0).min(max_tokens.saturating_sub(1));

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_index = 0u32;
        while start < tokens.len() {
            let end = (start + max_tokens).min(tokens.len());
            let chunk_text = tokens[start..end].join(" ");
            if !chunk_text.is_empty() {
                chunks.push(Chunk {
                    chunk_index,
                    text: chunk_text,
                    start_idx: None,
                    end_idx: None,
                    token_count: Some(end - start),
                    heading_path: None,
                    anchors: None,
                });
                chunk_index += 1;
            }
            if end >= tokens.len() {
                break;
            }
            start = end.saturating_sub(overlap);
        }
        chunks
    }
}
