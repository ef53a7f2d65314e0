//! Knowledge-base row shapes. ORM mapping and schema migration live outside
//! this crate's scope; these are the plain data shapes the in-memory
//! reference repositories operate on.

use std::collections::HashMap;

use serde_json::Value;

/// One knowledge-base item.
#[derive(Debug, Clone)]
pub struct KbItem {
    /// Primary key.
    pub id: String,
    /// Owning tenant/user, used to scope reads and indexed in the
    /// persisted schema.
    pub owner_user_id: String,
    /// Item kind (e.g. `"doc"`, `"faq"`).
    pub kind: String,
    /// Source system name.
    pub source: String,
    /// Source-specific reference.
    pub source_ref: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Full body text, chunked lazily by the retriever.
    pub content_text: String,
    /// Content hash, used as part of the chunk cache key.
    pub content_hash: String,
    /// Free-form item metadata.
    pub metadata: HashMap<String, Value>,
}

impl KbItem {
    /// Builds an item, deriving `content_hash` from `content_text`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        owner_user_id: impl Into<String>,
        kind: impl Into<String>,
        source: impl Into<String>,
        content_text: impl Into<String>,
    ) -> Self {
        let content_text = content_text.into();
        let content_hash = hash_content(&content_text);
        Self {
            id: id.into(),
            owner_user_id: owner_user_id.into(),
            kind: kind.into(),
            source: source.into(),
            source_ref: None,
            title: None,
            summary: None,
            content_text,
            content_hash,
            metadata: HashMap::new(),
        }
    }
}

/// Stable content hash for chunk-cache keying.
#[must_use]
pub fn hash_content(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    format!("{digest:x}")
}

/// One cached chunk row, keyed by item/content/chunker/model/index.
#[derive(Debug, Clone)]
pub struct ChunkCacheRow {
    /// Owning item id.
    pub item_id: String,
    /// Owning tenant/user, carried through from the item so cache reads
    /// stay scoped the same way item reads are.
    pub owner_user_id: String,
    /// Content hash at the time this chunk was computed.
    pub content_hash: String,
    /// Chunker that produced this chunk.
    pub chunker_id: String,
    /// Embedding model used to score this chunk, if any.
    pub embed_model_id: Option<String>,
    /// Position within the item's chunk sequence.
    pub chunk_index: u32,
    /// Cached chunk text.
    pub text: String,
    /// Start offset into the source text.
    pub start_idx: Option<usize>,
    /// End offset (exclusive) into the source text.
    pub end_idx: Option<usize>,
    /// Token count, if tracked.
    pub token_count: Option<usize>,
}
