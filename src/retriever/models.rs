//! Shapes exchanged between the retrieval pipeline and its callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full-text search dispatch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TsQueryMode {
    /// `websearch_to_tsquery`-style free-text parsing. Default.
    Web,
    /// `plainto_tsquery`-style: AND of all terms, no operators.
    Plain,
    /// `phraseto_tsquery`-style: terms must appear as an exact phrase.
    Phrase,
    /// `to_tsquery`-style: raw operator syntax, gated behind `allow_strict`.
    Strict,
}

impl Default for TsQueryMode {
    fn default() -> Self {
        Self::Web
    }
}

/// Lexical (full-text) search preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtsPrefs {
    /// Dispatch mode.
    #[serde(default)]
    pub mode: TsQueryMode,
    /// Search-configuration name (language/dictionary), if any.
    #[serde(default)]
    pub config: Option<String>,
    /// Rank function identifier, carried for parity with the original
    /// `ts_rank_cd` selection knob; the in-memory reference repo always
    /// ranks by term-overlap count regardless of this value.
    #[serde(default = "default_rank_func")]
    pub rank_func: String,
    /// Minimum rank a result must clear to be returned.
    #[serde(default)]
    pub min_rank: Option<f64>,
    /// Allows `mode = Strict`; otherwise strict mode is rejected.
    #[serde(default)]
    pub allow_strict: bool,
}

fn default_rank_func() -> String {
    "ts_rank_cd".to_string()
}

impl Default for FtsPrefs {
    fn default() -> Self {
        Self {
            mode: TsQueryMode::default(),
            config: None,
            rank_func: default_rank_func(),
            min_rank: None,
            allow_strict: false,
        }
    }
}

/// Vector search preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPrefs {
    /// Whether the query text should be embedded and searched at all.
    #[serde(default = "default_true")]
    pub embed_query: bool,
    /// Distance metric name, carried for parity; the reference embedder
    /// and in-memory repo always use cosine similarity.
    #[serde(default = "default_distance")]
    pub distance: String,
    /// Minimum similarity a result must clear to be returned.
    #[serde(default)]
    pub min_score: Option<f64>,
}

fn default_distance() -> String {
    "cosine".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for VectorPrefs {
    fn default() -> Self {
        Self {
            embed_query: true,
            distance: default_distance(),
            min_score: None,
        }
    }
}

/// Score-fusion blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Reciprocal rank fusion.
    Rrf,
    /// Weighted linear combination of normalized scores.
    Linear,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::Rrf
    }
}

/// Score normalization applied before a linear blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Logistic normalization into `(0, 1)`.
    Sigmoid,
    /// Min-max normalization into `[0, 1]`.
    Minmax,
    /// No normalization; raw scores are blended directly.
    None,
}

impl Default for NormalizeMode {
    fn default() -> Self {
        Self::Sigmoid
    }
}

/// Fusion scoring preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPrefs {
    /// Fusion strategy.
    #[serde(default)]
    pub blend: BlendMode,
    /// Lexical lane weight, used only when `blend = Linear`.
    #[serde(default = "default_w_text")]
    pub w_text: f64,
    /// Vector lane weight, used only when `blend = Linear`.
    #[serde(default = "default_w_vec")]
    pub w_vec: f64,
    /// Normalization applied before linear blending.
    #[serde(default)]
    pub normalize: NormalizeMode,
    /// RRF rank-offset constant.
    #[serde(default = "default_k")]
    pub k: u32,
}

fn default_w_text() -> f64 {
    0.35
}
fn default_w_vec() -> f64 {
    0.65
}
const fn default_k() -> u32 {
    60
}

impl Default for ScoringPrefs {
    fn default() -> Self {
        Self {
            blend: BlendMode::default(),
            w_text: default_w_text(),
            w_vec: default_w_vec(),
            normalize: NormalizeMode::default(),
            k: default_k(),
        }
    }
}

/// Late-chunking preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingPrefs {
    /// Chunking strategy label, carried for parity; chunking always
    /// happens late (after candidate selection) in this pipeline.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Id or alias of the registered chunker to use.
    #[serde(default = "default_chunker_id")]
    pub chunker_id: String,
    /// Whether heading breadcrumbs should be carried into chunks.
    #[serde(default = "default_true")]
    pub include_headers: bool,
    /// Maximum tokens per chunk, for token-based chunkers.
    #[serde(default)]
    pub max_chunk_tokens: Option<usize>,
    /// Overlapping tokens, for token-based chunkers.
    #[serde(default)]
    pub overlap_tokens: Option<usize>,
}

fn default_strategy() -> String {
    "late".to_string()
}
fn default_chunker_id() -> String {
    "default".to_string()
}

impl Default for ChunkingPrefs {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunker_id: default_chunker_id(),
            include_headers: true,
            max_chunk_tokens: None,
            overlap_tokens: None,
        }
    }
}

/// Chunk-cache preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePrefs {
    /// Whether cached chunks may be served in place of recomputation.
    #[serde(default = "default_true")]
    pub use_chunk_cache: bool,
    /// Whether freshly chunked evidence should be written back to the
    /// cache.
    #[serde(default = "default_true")]
    pub write_chunk_cache: bool,
    /// Entry lifetime, carried for parity; the in-memory cache does not
    /// enforce expiry.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl Default for CachePrefs {
    fn default() -> Self {
        Self {
            use_chunk_cache: true,
            write_chunk_cache: true,
            ttl_seconds: None,
        }
    }
}

/// Snippet-selection preferences threaded through to the evidence packer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetPrefs {
    /// Maximum snippet length, in characters.
    #[serde(default = "default_snippet_chars")]
    pub max_chars: usize,
    /// Whether a chunk snippet should be preferred over a document
    /// summary when both are available.
    #[serde(default = "default_true")]
    pub prefer_chunk_snippet: bool,
}

const fn default_snippet_chars() -> usize {
    360
}

impl Default for SnippetPrefs {
    fn default() -> Self {
        Self {
            max_chars: default_snippet_chars(),
            prefer_chunk_snippet: true,
        }
    }
}

/// Full set of knobs a caller may supply for one retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalPrefs {
    /// Raw query text.
    pub query_text: String,
    /// Equality filters applied by the item repository.
    #[serde(default)]
    pub filters: HashMap<String, Value>,

    /// Maximum fused candidates to keep before late chunking.
    #[serde(default = "default_top_k_items")]
    pub top_k_items: usize,
    /// Maximum evidence chunks to keep after late chunking.
    #[serde(default = "default_top_k_chunks")]
    pub top_k_chunks: usize,
    /// Maximum chunks kept per candidate item before the global cap.
    #[serde(default = "default_per_item_cap")]
    pub per_item_chunk_cap: usize,

    /// Lexical search preferences.
    #[serde(default)]
    pub fts: FtsPrefs,
    /// Vector search preferences.
    #[serde(default)]
    pub vector: VectorPrefs,
    /// Fusion scoring preferences.
    #[serde(default)]
    pub scoring: ScoringPrefs,
    /// Late-chunking preferences.
    #[serde(default)]
    pub chunking: ChunkingPrefs,
    /// Chunk-cache preferences.
    #[serde(default)]
    pub cache: CachePrefs,
    /// Snippet-selection preferences.
    #[serde(default)]
    pub snippet: SnippetPrefs,
    /// Whether retrieval stats should include raw parameter dumps.
    #[serde(default)]
    pub debug: bool,
}

fn default_top_k_items() -> usize {
    20
}
fn default_top_k_chunks() -> usize {
    12
}
fn default_per_item_cap() -> usize {
    3
}

impl RetrievalPrefs {
    /// Builds preferences from just a query string, defaulting everything
    /// else.
    #[must_use]
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            filters: HashMap::new(),
            top_k_items: default_top_k_items(),
            top_k_chunks: default_top_k_chunks(),
            per_item_chunk_cap: default_per_item_cap(),
            fts: FtsPrefs::default(),
            vector: VectorPrefs::default(),
            scoring: ScoringPrefs::default(),
            chunking: ChunkingPrefs::default(),
            cache: CachePrefs::default(),
            snippet: SnippetPrefs::default(),
            debug: false,
        }
    }
}

/// One fused item returned by the retrieval pipeline, before evidence
/// packing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Item identifier in the knowledge base.
    pub item_id: String,
    /// Item kind (e.g. `"doc"`, `"faq"`).
    pub kind: String,
    /// Source system name.
    pub source: String,
    /// Source-specific reference (e.g. a URL), if any.
    #[serde(default)]
    pub source_ref: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Short summary, used as a snippet fallback.
    #[serde(default)]
    pub summary: Option<String>,
    /// Free-form item metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Final fused score.
    #[serde(default)]
    pub score: f64,
    /// Raw lexical score, if the item matched the lexical lane.
    #[serde(default)]
    pub score_text: Option<f64>,
    /// Raw vector score, if the item matched the vector lane.
    #[serde(default)]
    pub score_vec: Option<f64>,
    /// Lexical-lane rank (1-based), if matched.
    #[serde(default)]
    pub rank_text: Option<u32>,
    /// Vector-lane rank (1-based), if matched.
    #[serde(default)]
    pub rank_vec: Option<u32>,

    /// Snippet text, populated by the evidence packer, not the retriever.
    #[serde(default)]
    pub snippet: Option<String>,
    /// Snippet provenance: `"chunk"`, `"doc"`, or `"unknown"`.
    #[serde(default = "default_unknown")]
    pub snippet_from: String,
}

fn default_unknown() -> String {
    "unknown".to_string()
}

/// A late-chunked span of one candidate's content, scored against the
/// query vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Owning candidate's item id.
    pub item_id: String,
    /// Stable chunk identifier, `"{item_id}:{chunk_index}"`.
    #[serde(default)]
    pub chunk_id: Option<String>,

    /// Chunk text.
    pub text: String,
    /// Start offset into the source text.
    #[serde(default)]
    pub start_idx: Option<usize>,
    /// End offset (exclusive) into the source text.
    #[serde(default)]
    pub end_idx: Option<usize>,
    /// Token count, if the chunker tracks it.
    #[serde(default)]
    pub token_count: Option<usize>,

    /// Score used to rank this chunk among others for the same item.
    #[serde(default)]
    pub score: f64,
    /// Raw lexical score, currently unused by the late-chunking pass.
    #[serde(default)]
    pub score_text: Option<f64>,
    /// Raw vector (cosine) score against the query vector.
    #[serde(default)]
    pub score_vec: Option<f64>,

    /// Heading breadcrumb, if the chunker tracked one.
    #[serde(default)]
    pub heading_path: Option<Vec<String>>,
    /// Free-form anchor metadata.
    #[serde(default)]
    pub anchors: Option<HashMap<String, Value>>,
}

/// Per-call diagnostics, populated only when `debug = true` for `params`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalStats {
    /// Wall-clock timings by stage name, in milliseconds.
    #[serde(default)]
    pub timing_ms: HashMap<String, f64>,
    /// Result counts by stage name.
    #[serde(default)]
    pub counts: HashMap<String, usize>,
    /// Raw preference dump, populated only when the caller requested
    /// debug output.
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

/// The full output of one retrieval call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalBundle {
    /// Fused, item-level candidates.
    #[serde(default)]
    pub candidates: Vec<CandidateItem>,
    /// Late-chunked evidence spans.
    #[serde(default)]
    pub evidence: Vec<EvidenceChunk>,
    /// Diagnostics for this call.
    #[serde(default)]
    pub stats: RetrievalStats,
}
