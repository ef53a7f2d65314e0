//! Deterministic character-based chunker with optional overlap.

use super::model::{Chunk, ChunkingOptions};
use super::protocols::Chunker;

/// Splits text into fixed-size character windows with optional overlap.
#[derive(Debug, Default)]
pub struct SimpleCharChunker;

impl SimpleCharChunker {
    /// Creates a new chunker instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Chunker for SimpleCharChunker {
    fn chunker_id(&self) -> &str {
        "simple_char@v1"
    }

    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let max_chars = options.max_chunk_chars.unwrap_or(500).max(1);
        let overlap = options.overlap_chars.unwrap_or(0).min(max_chars.saturating_sub(1));

        let mut chunks = Vec::new();
        let mut idx = 0usize;
        let mut chunk_index = 0u32;
        while idx < chars.len() {
            let end = (idx + max_chars).min(chars.len());
            let chunk_text: String = chars[idx..end].iter().collect();
            if !chunk_text.is_empty() {
                chunks.push(Chunk {
                    chunk_index,
                    text: chunk_text,
                    start_idx: Some(idx),
                    end_idx: Some(end),
                    token_count: None,
                    heading_path: None,
                    anchors: None,
                });
                chunk_index += 1;
            }
            if end >= chars.len() {
                break;
            }
            idx = end.saturating_sub(overlap);
        }
        chunks
    }
}
