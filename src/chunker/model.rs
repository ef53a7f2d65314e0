//! Chunk and chunking-option shapes shared by every chunker implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One contiguous span of a source document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk within its document's chunk sequence, 0-based.
    pub chunk_index: u32,
    /// The chunk's text.
    pub text: String,
    /// Start offset into the source text, if the chunker tracks offsets.
    #[serde(default)]
    pub start_idx: Option<usize>,
    /// End offset (exclusive) into the source text.
    #[serde(default)]
    pub end_idx: Option<usize>,
    /// Token count, for chunkers that operate in token space.
    #[serde(default)]
    pub token_count: Option<usize>,
    /// Heading breadcrumb, for structure-aware chunkers.
    #[serde(default)]
    pub heading_path: Option<Vec<String>>,
    /// Free-form anchor metadata (e.g. source line ranges).
    #[serde(default)]
    pub anchors: Option<HashMap<String, Value>>,
}

/// Parameters controlling how a document is split into chunks.
///
/// Fields are strategy-specific and a chunker implementation ignores the
/// ones it doesn't use; `SimpleCharChunker` reads `max_chunk_chars` and
/// `overlap_chars`, `SimpleTokenChunker` reads `max_chunk_tokens` and
/// `overlap_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Whether headings should be carried into `Chunk::heading_path`.
    #[serde(default = "default_true")]
    pub include_headers: bool,
    /// Maximum whitespace-delimited tokens per chunk.
    #[serde(default)]
    pub max_chunk_tokens: Option<usize>,
    /// Overlapping tokens carried from the end of one chunk into the next.
    #[serde(default)]
    pub overlap_tokens: Option<usize>,
    /// Maximum characters per chunk.
    #[serde(default)]
    pub max_chunk_chars: Option<usize>,
    /// Overlapping characters carried from the end of one chunk into the
    /// next.
    #[serde(default)]
    pub overlap_chars: Option<usize>,
    /// Chunker-selection hint, independent of the registry id (unused by
    /// the reference chunkers, carried for router-side policy).
    #[serde(default)]
    pub strategy: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            include_headers: true,
            max_chunk_tokens: None,
            overlap_tokens: None,
            max_chunk_chars: None,
            overlap_chars: None,
            strategy: None,
        }
    }
}
