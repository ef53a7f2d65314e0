//! Deterministic candidate/chunk → bounded source list packer.

use std::collections::HashMap;
use std::cmp::Ordering;

use serde_json::Value;

use crate::retriever::models::{CandidateItem, EvidenceChunk};

use super::models::{EvidencePackOptions, OrderBy, SourceItem};

/// Packs retrieval candidates (and optional late-chunked evidence) into a
/// bounded, deterministically ordered source list.
pub trait EvidencePacker: Send + Sync {
    /// Packs `candidates`, preferring chunk snippets from `evidence_chunks`
    /// when `options.prefer_chunk_snippets` is set and a match exists.
    fn pack(
        &self,
        candidates: &[CandidateItem],
        evidence_chunks: Option<&[EvidenceChunk]>,
        options: &EvidencePackOptions,
    ) -> Vec<SourceItem>;
}

/// Reference [`EvidencePacker`]: pure, deterministic, and stateless.
#[derive(Debug, Default)]
pub struct DefaultEvidencePacker;

impl DefaultEvidencePacker {
    /// Builds a new packer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn order_candidates(candidates: &[CandidateItem], options: &EvidencePackOptions) -> Vec<CandidateItem> {
        let mut ordered: Vec<CandidateItem> = candidates.to_vec();
        match options.order_by {
            OrderBy::Input => {}
            OrderBy::Rank => ordered.sort_by(|a, b| {
                let rank_a = a.rank_text.or(a.rank_vec);
                let rank_b = b.rank_text.or(b.rank_vec);
                rank_key(rank_a, a.score).cmp(&rank_key(rank_b, b.score))
            }),
            OrderBy::Score => ordered.sort_by(|a, b| score_key(a.score).cmp(&score_key(b.score))),
        }
        ordered
    }

    fn select_snippet(
        candidate: &CandidateItem,
        evidence_chunks: Option<&[EvidenceChunk]>,
        options: &EvidencePackOptions,
    ) -> (Option<String>, String) {
        if options.prefer_chunk_snippets {
            if let Some(chunks) = evidence_chunks {
                let mut matching: Vec<&EvidenceChunk> =
                    chunks.iter().filter(|c| c.item_id == candidate.item_id).collect();
                if !matching.is_empty() {
                    matching.sort_by(|a, b| score_key(Some(a.score)).cmp(&score_key(Some(b.score))));
                    let best = matching[0];
                    let snippet = truncate_chars(&best.text, options.max_snippet_chars);
                    return (Some(snippet), "chunk".to_string());
                }
            }
        }
        let fallback = candidate.summary.clone().or_else(|| candidate.snippet.clone());
        match fallback {
            Some(text) => (Some(truncate_chars(&text, options.max_snippet_chars)), "doc".to_string()),
            None => (None, "unknown".to_string()),
        }
    }

    fn filter_metadata(
        metadata: &HashMap<String, Value>,
        options: &EvidencePackOptions,
    ) -> HashMap<String, Value> {
        let mut filtered = metadata.clone();
        if let Some(include) = &options.include_metadata_keys {
            filtered.retain(|k, _| include.contains(k));
        }
        if let Some(exclude) = &options.exclude_metadata_keys {
            filtered.retain(|k, _| !exclude.contains(k));
        }
        filtered
    }
}

/// Sort key for descending-score order under an ascending `cmp`, via
/// negation.
fn score_key(score: f64) -> OrderedF64 {
    OrderedF64(-score)
}

fn rank_key(rank: Option<u32>, score: f64) -> (u32, OrderedF64) {
    (rank.unwrap_or(u32::MAX), OrderedF64(-score))
}

/// Total-order wrapper over `f64` for sort keys; retrieval scores are
/// never `NaN` in this pipeline, so treating them as totally ordered is
/// safe.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedF64(f64);

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl EvidencePacker for DefaultEvidencePacker {
    fn pack(
        &self,
        candidates: &[CandidateItem],
        evidence_chunks: Option<&[EvidenceChunk]>,
        options: &EvidencePackOptions,
    ) -> Vec<SourceItem> {
        let ordered = Self::order_candidates(candidates, options);
        ordered
            .into_iter()
            .take(options.max_sources)
            .enumerate()
            .map(|(idx, candidate)| {
                let (snippet, snippet_from) = Self::select_snippet(&candidate, evidence_chunks, options);
                let metadata = Self::filter_metadata(&candidate.metadata, options);
                SourceItem {
                    source_id: candidate.item_id,
                    kind: candidate.kind,
                    title: candidate.title,
                    url: candidate.source_ref,
                    snippet,
                    snippet_from,
                    score: Some(candidate.score),
                    rank: Some(u32::try_from(idx + 1).unwrap_or(u32::MAX)),
                    metadata,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(idx: u32, score: f64, rank_text: Option<u32>) -> CandidateItem {
        let mut metadata = HashMap::new();
        metadata.insert("keep".to_string(), Value::from(idx));
        metadata.insert("drop".to_string(), Value::from(idx));
        CandidateItem {
            item_id: format!("id{idx}"),
            kind: "doc".to_string(),
            source: "kb".to_string(),
            score,
            rank_text,
            title: Some(format!("title {idx}")),
            summary: Some(format!("summary {idx}")),
            metadata,
            ..CandidateItem::default()
        }
    }

    fn make_chunk(item_id: &str, score: f64, text: &str) -> EvidenceChunk {
        EvidenceChunk {
            item_id: item_id.to_string(),
            text: text.to_string(),
            score,
            ..EvidenceChunk::default()
        }
    }

    #[test]
    fn test_deterministic_output() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![make_candidate(1, 0.5, None), make_candidate(2, 0.4, None)];
        let opts = EvidencePackOptions::default();
        let first = packer.pack(&candidates, None, &opts);
        let second = packer.pack(&candidates, None, &opts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_snippet_preference() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![make_candidate(1, 0.5, None)];
        let chunks = vec![make_chunk("id1", 0.9, "chunk text")];
        let opts = EvidencePackOptions {
            prefer_chunk_snippets: true,
            ..EvidencePackOptions::default()
        };
        let out = packer.pack(&candidates, Some(&chunks), &opts);
        assert_eq!(out[0].snippet.as_deref(), Some("chunk text"));
        assert_eq!(out[0].snippet_from, "chunk");
    }

    #[test]
    fn test_doc_fallback_when_no_chunks() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![make_candidate(1, 0.5, None)];
        let opts = EvidencePackOptions {
            prefer_chunk_snippets: true,
            ..EvidencePackOptions::default()
        };
        let out = packer.pack(&candidates, None, &opts);
        assert!(out[0].snippet.as_deref().unwrap_or_default().starts_with("summary"));
        assert_eq!(out[0].snippet_from, "doc");
    }

    #[test]
    fn test_order_by_score_and_max_sources() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![
            make_candidate(1, 0.2, None),
            make_candidate(2, 0.9, None),
            make_candidate(3, 0.5, None),
        ];
        let opts = EvidencePackOptions {
            max_sources: 2,
            order_by: OrderBy::Score,
            ..EvidencePackOptions::default()
        };
        let out = packer.pack(&candidates, None, &opts);
        let ids: Vec<&str> = out.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["id2", "id3"]);
    }

    #[test]
    fn test_order_by_input() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![make_candidate(1, 0.1, None), make_candidate(2, 0.9, None)];
        let opts = EvidencePackOptions {
            order_by: OrderBy::Input,
            ..EvidencePackOptions::default()
        };
        let out = packer.pack(&candidates, None, &opts);
        let ids: Vec<&str> = out.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["id1", "id2"]);
    }

    #[test]
    fn test_metadata_include_exclude() {
        let packer = DefaultEvidencePacker::new();
        let candidates = vec![make_candidate(1, 0.5, None)];
        let opts = EvidencePackOptions {
            include_metadata_keys: Some(vec!["keep".to_string()]),
            exclude_metadata_keys: Some(vec!["drop".to_string()]),
            ..EvidencePackOptions::default()
        };
        let out = packer.pack(&candidates, None, &opts);
        assert!(out[0].metadata.contains_key("keep"));
        assert!(!out[0].metadata.contains_key("drop"));
    }

    #[test]
    fn test_missing_fields_do_not_crash() {
        let packer = DefaultEvidencePacker::new();
        let candidate = CandidateItem {
            item_id: "id1".to_string(),
            kind: "doc".to_string(),
            source: "kb".to_string(),
            score: 0.1,
            ..CandidateItem::default()
        };
        let out = packer.pack(&[candidate], None, &EvidencePackOptions::default());
        assert!(out[0].title.is_none());
        assert!(out[0].url.is_none());
    }
}
