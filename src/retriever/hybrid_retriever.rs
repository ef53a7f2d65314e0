//! Hybrid retrieval pipeline: lexical + vector fusion, then late chunking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::chunker::{ChunkerRegistry, ChunkingOptions};
use crate::error::OrchestratorError;
use crate::protocol::context::RequestContext;
use crate::storage::models::{hash_content, ChunkCacheRow, KbItem};
use crate::storage::{ChunkCacheRepo, ItemRepo};

use super::embedder::{cosine_similarity, Embedder};
use super::hybrid_scorer::HybridScorer;
use super::models::{CandidateItem, EvidenceChunk, RetrievalBundle, RetrievalPrefs, RetrievalStats};
use super::protocols::Retriever;

/// Retriever implementing the lexical+vector fusion and late-chunking
/// pipeline described by the evidence and retrieval design.
pub struct HybridRetriever {
    item_repo: Arc<dyn ItemRepo>,
    chunker_registry: Arc<dyn ChunkerRegistry>,
    embedder: Arc<dyn Embedder>,
    chunk_cache_repo: Arc<dyn ChunkCacheRepo>,
    hybrid_scorer: HybridScorer,
}

impl HybridRetriever {
    /// Builds a retriever from its collaborators.
    #[must_use]
    pub fn new(
        item_repo: Arc<dyn ItemRepo>,
        chunker_registry: Arc<dyn ChunkerRegistry>,
        embedder: Arc<dyn Embedder>,
        chunk_cache_repo: Arc<dyn ChunkCacheRepo>,
    ) -> Self {
        Self {
            item_repo,
            chunker_registry,
            embedder,
            chunk_cache_repo,
            hybrid_scorer: HybridScorer::default(),
        }
    }

    async fn late_chunk(
        &self,
        ctx: &RequestContext,
        prefs: &RetrievalPrefs,
        candidates: &[CandidateItem],
        item_map: &HashMap<String, KbItem>,
        query_vec: Option<&[f64]>,
    ) -> Result<Vec<EvidenceChunk>, OrchestratorError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let chunker_id = &prefs.chunking.chunker_id;
        let chunker = self.chunker_registry.get(chunker_id)?;
        let options = ChunkingOptions {
            include_headers: prefs.chunking.include_headers,
            max_chunk_tokens: prefs.chunking.max_chunk_tokens,
            overlap_tokens: prefs.chunking.overlap_tokens,
            max_chunk_chars: None,
            overlap_chars: None,
            strategy: Some(prefs.chunking.strategy.clone()),
        };

        let mut evidence = Vec::new();
        for candidate in candidates {
            if ctx.cancelled() {
                warn!(request_id = %ctx.request_id, "cancellation observed during late chunking");
                return Err(OrchestratorError::Cancelled);
            }
            let Some(item) = item_map.get(&candidate.item_id) else {
                continue;
            };
            if item.content_text.is_empty() {
                continue;
            }

            let cached = if prefs.cache.use_chunk_cache {
                self.chunk_cache_repo
                    .get_cached_chunks(
                        &candidate.item_id,
                        &item.content_hash,
                        chunker_id,
                        Some(self.embedder.model_id()),
                    )
                    .await
            } else {
                Vec::new()
            };

            if !cached.is_empty() {
                evidence.extend(cached.into_iter().map(cache_row_to_evidence));
                continue;
            }

            let chunks = chunker.chunk(&item.content_text, &options);
            let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let chunk_vecs = if query_vec.is_some() {
                self.embedder.embed_texts(&chunk_texts).await
            } else {
                Vec::new()
            };

            let mut per_item: Vec<EvidenceChunk> = chunks
                .iter()
                .enumerate()
                .map(|(idx, chunk)| {
                    let vec_score = match (query_vec, chunk_vecs.get(idx)) {
                        (Some(qv), Some(cv)) => cosine_similarity(qv, cv),
                        _ => 0.0,
                    };
                    EvidenceChunk {
                        item_id: candidate.item_id.clone(),
                        chunk_id: Some(format!("{}:{}", candidate.item_id, chunk.chunk_index)),
                        text: chunk.text.clone(),
                        start_idx: chunk.start_idx,
                        end_idx: chunk.end_idx,
                        token_count: chunk.token_count,
                        score: vec_score,
                        score_text: None,
                        score_vec: Some(vec_score),
                        heading_path: chunk.heading_path.clone(),
                        anchors: chunk.anchors.clone(),
                    }
                })
                .collect();

            per_item.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            per_item.truncate(prefs.per_item_chunk_cap);

            if prefs.cache.write_chunk_cache && !per_item.is_empty() {
                let rows: Vec<ChunkCacheRow> = per_item
                    .iter()
                    .enumerate()
                    .map(|(idx, ev)| ChunkCacheRow {
                        item_id: candidate.item_id.clone(),
                        owner_user_id: item.owner_user_id.clone(),
                        content_hash: item.content_hash.clone(),
                        chunker_id: chunker_id.clone(),
                        embed_model_id: Some(self.embedder.model_id().to_string()),
                        chunk_index: u32::try_from(idx).unwrap_or(u32::MAX),
                        text: ev.text.clone(),
                        start_idx: ev.start_idx,
                        end_idx: ev.end_idx,
                        token_count: ev.token_count,
                    })
                    .collect();
                self.chunk_cache_repo
                    .write_cached_chunks(
                        &candidate.item_id,
                        &item.owner_user_id,
                        &item.content_hash,
                        chunker_id,
                        Some(self.embedder.model_id()),
                        &rows,
                    )
                    .await;
            }

            evidence.extend(per_item);
        }

        evidence.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        evidence.truncate(prefs.top_k_chunks);
        Ok(evidence)
    }
}

/// Cache hits are served with `score = 0.0`: the cached chunk was not
/// recomputed against the live query vector, so no comparable score
/// exists for it.
fn cache_row_to_evidence(row: ChunkCacheRow) -> EvidenceChunk {
    EvidenceChunk {
        item_id: row.item_id,
        chunk_id: Some(format!("{}:{}", row.item_id, row.chunk_index)),
        text: row.text,
        start_idx: row.start_idx,
        end_idx: row.end_idx,
        token_count: row.token_count,
        score: 0.0,
        score_text: None,
        score_vec: None,
        heading_path: None,
        anchors: None,
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn search(
        &self,
        ctx: &RequestContext,
        prefs: &RetrievalPrefs,
    ) -> Result<RetrievalBundle, OrchestratorError> {
        debug!(request_id = %ctx.request_id, query = %prefs.query_text, "retrieval dispatched");

        let mut timings: HashMap<String, f64> = HashMap::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        let start = Instant::now();
        let fts_results = self.item_repo.search_fts(&prefs.query_text, prefs).await?;
        timings.insert("fts_ms".to_string(), start.elapsed().as_secs_f64() * 1000.0);
        counts.insert("fts".to_string(), fts_results.len());

        let mut query_vec: Option<Vec<f64>> = None;
        let mut vec_results: Vec<(String, f64)> = Vec::new();
        if prefs.vector.embed_query {
            let start = Instant::now();
            let qv = self.embedder.embed_query(&prefs.query_text).await;
            vec_results = self.item_repo.search_vec(&qv, prefs).await;
            timings.insert("vec_ms".to_string(), start.elapsed().as_secs_f64() * 1000.0);
            counts.insert("vec".to_string(), vec_results.len());
            query_vec = Some(qv);
        }

        let fused = self
            .hybrid_scorer
            .fuse(&fts_results, &vec_results, prefs.top_k_items);

        let item_ids: Vec<String> = fused.iter().map(|s| s.item_id.clone()).collect();
        let items = self.item_repo.fetch_items_by_ids(&item_ids).await;
        let item_map: HashMap<String, KbItem> = items.into_iter().map(|item| (item.id.clone(), item)).collect();

        let mut candidates = Vec::with_capacity(fused.len());
        for score in fused {
            if ctx.cancelled() {
                warn!(request_id = %ctx.request_id, "cancellation observed during candidate assembly");
                return Err(OrchestratorError::Cancelled);
            }
            let Some(item) = item_map.get(&score.item_id) else {
                continue;
            };
            candidates.push(CandidateItem {
                item_id: item.id.clone(),
                kind: item.kind.clone(),
                source: item.source.clone(),
                source_ref: item.source_ref.clone(),
                title: item.title.clone(),
                summary: item.summary.clone(),
                metadata: item.metadata.clone(),
                score: score.score,
                score_text: score.score_text,
                score_vec: score.score_vec,
                rank_text: score.rank_text,
                rank_vec: score.rank_vec,
                snippet: None,
                snippet_from: "unknown".to_string(),
            });
        }

        let evidence = self
            .late_chunk(ctx, prefs, &candidates, &item_map, query_vec.as_deref())
            .await?;

        counts.insert("candidates".to_string(), candidates.len());
        counts.insert("evidence".to_string(), evidence.len());
        debug!(
            request_id = %ctx.request_id,
            candidates = counts["candidates"],
            evidence = counts["evidence"],
            "retrieval result"
        );

        let params: HashMap<String, Value> = if prefs.debug {
            let mut p = HashMap::new();
            p.insert(
                "fts".to_string(),
                serde_json::to_value(&prefs.fts).unwrap_or(Value::Null),
            );
            p.insert(
                "vector".to_string(),
                serde_json::to_value(&prefs.vector).unwrap_or(Value::Null),
            );
            p.insert(
                "chunking".to_string(),
                serde_json::to_value(&prefs.chunking).unwrap_or(Value::Null),
            );
            p
        } else {
            HashMap::new()
        };

        Ok(RetrievalBundle {
            candidates,
            evidence,
            stats: RetrievalStats {
                timing_ms: timings,
                counts,
                params,
            },
        })
    }
}

/// Content hash helper re-exported for callers building [`KbItem`] fixtures
/// without going through [`KbItem::new`].
#[must_use]
pub fn content_hash(text: &str) -> String {
    hash_content(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::InMemoryChunkerRegistry;
    use crate::retriever::embedder::DeterministicEmbedder;
    use crate::storage::{InMemoryChunkCacheRepo, InMemoryItemRepo};

    async fn build_retriever(items: Vec<KbItem>) -> HybridRetriever {
        let embedder: Arc<dyn Embedder> = Arc::new(DeterministicEmbedder::default());
        let item_repo: Arc<dyn ItemRepo> = Arc::new(InMemoryItemRepo::new(items, embedder.as_ref()).await);
        let chunker_registry: Arc<dyn ChunkerRegistry> = Arc::new(InMemoryChunkerRegistry::new());
        let chunk_cache_repo: Arc<dyn ChunkCacheRepo> = Arc::new(InMemoryChunkCacheRepo::new());
        HybridRetriever::new(item_repo, chunker_registry, embedder, chunk_cache_repo)
    }

    #[tokio::test]
    async fn test_search_returns_candidates_and_evidence() {
        let item = KbItem::new("doc1", "owner-1", "doc", "kb", "rust async retrieval pipelines are great");
        let retriever = build_retriever(vec![item]).await;
        let ctx = RequestContext::new("req-1");
        let prefs = RetrievalPrefs::new("rust async");
        let bundle = retriever.search(&ctx, &prefs).await.unwrap_or_else(|_| unreachable!());
        assert!(!bundle.candidates.is_empty());
        assert!(!bundle.evidence.is_empty());
        assert_eq!(bundle.stats.counts.get("candidates"), Some(&bundle.candidates.len()));
    }

    #[tokio::test]
    async fn test_cache_hit_scores_zero() {
        let item = KbItem::new("doc1", "owner-1", "doc", "kb", "rust async retrieval pipelines are great");
        let retriever = build_retriever(vec![item]).await;
        let ctx = RequestContext::new("req-1");
        let prefs = RetrievalPrefs::new("rust async");
        let first = retriever.search(&ctx, &prefs).await.unwrap_or_else(|_| unreachable!());
        assert!(first.evidence.iter().any(|e| e.score > 0.0));

        let second = retriever.search(&ctx, &prefs).await.unwrap_or_else(|_| unreachable!());
        assert!(second.evidence.iter().all(|e| e.score == 0.0));
    }

    #[tokio::test]
    async fn test_cancellation_returns_error() {
        let item = KbItem::new("doc1", "owner-1", "doc", "kb", "rust async retrieval");
        let retriever = build_retriever(vec![item]).await;
        let ctx = RequestContext::new("req-1");
        ctx.cancel();
        let prefs = RetrievalPrefs::new("rust async");
        let result = retriever.search(&ctx, &prefs).await;
        assert!(matches!(result, Err(OrchestratorError::Cancelled)));
    }
}
