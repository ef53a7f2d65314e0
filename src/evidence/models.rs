//! Evidence-packing options and output shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate ordering policy for [`super::packer::EvidencePacker::pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// Descending fused score, `None` scores sorted last.
    Score,
    /// Ascending lexical-or-vector rank (whichever is present), ties
    /// broken by descending score.
    Rank,
    /// The order candidates were supplied in.
    Input,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::Score
    }
}

/// Options controlling how candidates and chunks become [`super::models::SourceItem`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePackOptions {
    /// Maximum sources in the packed output.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    /// Whether a matching chunk snippet is preferred over the candidate's
    /// own summary/snippet field.
    #[serde(default = "default_true")]
    pub prefer_chunk_snippets: bool,
    /// Maximum snippet length, in characters.
    #[serde(default = "default_snippet_chars")]
    pub max_snippet_chars: usize,
    /// If set, only these metadata keys survive packing.
    #[serde(default)]
    pub include_metadata_keys: Option<Vec<String>>,
    /// If set, these metadata keys are dropped after inclusion filtering.
    #[serde(default)]
    pub exclude_metadata_keys: Option<Vec<String>>,
    /// Candidate ordering policy.
    #[serde(default)]
    pub order_by: OrderBy,
    /// Whether packing diagnostics should be retained (currently unused
    /// by the packer itself, carried for parity with the retrieval side's
    /// debug flag).
    #[serde(default)]
    pub debug: bool,
}

const fn default_max_sources() -> usize {
    6
}
const fn default_snippet_chars() -> usize {
    360
}
const fn default_true() -> bool {
    true
}

impl Default for EvidencePackOptions {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            prefer_chunk_snippets: true,
            max_snippet_chars: default_snippet_chars(),
            include_metadata_keys: None,
            exclude_metadata_keys: None,
            order_by: OrderBy::default(),
            debug: false,
        }
    }
}

/// One packed, client-facing evidence source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Owning item id.
    pub source_id: String,
    /// Item kind.
    pub kind: String,
    /// Display title, if any.
    pub title: Option<String>,
    /// Source URL/reference, if any.
    pub url: Option<String>,
    /// Packed snippet text, if one could be selected.
    pub snippet: Option<String>,
    /// Snippet provenance: `"chunk"`, `"doc"`, or `"unknown"`.
    pub snippet_from: String,
    /// Fused candidate score.
    pub score: Option<f64>,
    /// 1-based position in the packed list.
    pub rank: Option<u32>,
    /// Filtered candidate metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
