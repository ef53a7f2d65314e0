//! In-memory reference repositories.
//!
//! Exercise the full retrieval pipeline without a real database: items
//! live in a `Vec` behind a lock, and a vector lane is implemented for
//! real (not stubbed to empty) by embedding each item's content text with
//! the same [`Embedder`] used to embed queries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::OrchestratorError;
use crate::retriever::embedder::{cosine_similarity, Embedder};
use crate::retriever::models::RetrievalPrefs;
use crate::retriever::tsquery;

use super::models::{ChunkCacheRow, KbItem};
use super::protocols::{ChunkCacheRepo, ItemRepo};

struct IndexedItem {
    item: KbItem,
    vector: Vec<f64>,
}

/// [`ItemRepo`] backed by an in-process vector of items, each embedded
/// once at insertion time.
pub struct InMemoryItemRepo {
    items: Vec<IndexedItem>,
}

impl InMemoryItemRepo {
    /// Builds a repo by embedding every item's `content_text` with
    /// `embedder`.
    pub async fn new(items: Vec<KbItem>, embedder: &dyn Embedder) -> Self {
        let mut indexed = Vec::with_capacity(items.len());
        for item in items {
            let vector = embedder.embed_query(&item.content_text).await;
            indexed.push(IndexedItem { item, vector });
        }
        Self { items: indexed }
    }
}

#[async_trait]
impl ItemRepo for InMemoryItemRepo {
    async fn search_fts(
        &self,
        query_text: &str,
        prefs: &RetrievalPrefs,
    ) -> Result<Vec<(String, f64)>, OrchestratorError> {
        let query = tsquery::build(query_text, prefs.fts.mode, prefs.fts.allow_strict)?;
        let min_rank = prefs.fts.min_rank.unwrap_or(f64::MIN);

        let mut results: Vec<(String, f64)> = self
            .items
            .iter()
            .filter(|indexed| item_matches_filters(&indexed.item, prefs))
            .filter_map(|indexed| {
                let haystack = format!(
                    "{} {} {}",
                    indexed.item.title.clone().unwrap_or_default(),
                    indexed.item.summary.clone().unwrap_or_default(),
                    indexed.item.content_text
                );
                let rank = query.score(&haystack);
                (rank > 0.0 && rank >= min_rank).then_some((indexed.item.id.clone(), rank))
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(prefs.top_k_items);
        Ok(results)
    }

    async fn search_vec(&self, query_vec: &[f64], prefs: &RetrievalPrefs) -> Vec<(String, f64)> {
        let min_score = prefs.vector.min_score.unwrap_or(f64::MIN);
        let mut results: Vec<(String, f64)> = self
            .items
            .iter()
            .filter(|indexed| item_matches_filters(&indexed.item, prefs))
            .map(|indexed| (indexed.item.id.clone(), cosine_similarity(query_vec, &indexed.vector)))
            .filter(|(_, score)| *score >= min_score)
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(prefs.top_k_items);
        results
    }

    async fn fetch_items_by_ids(&self, item_ids: &[String]) -> Vec<KbItem> {
        self.items
            .iter()
            .filter(|indexed| item_ids.contains(&indexed.item.id))
            .map(|indexed| indexed.item.clone())
            .collect()
    }
}

fn item_matches_filters(item: &KbItem, prefs: &RetrievalPrefs) -> bool {
    prefs.filters.iter().all(|(key, value)| match key.as_str() {
        "kind" => value.as_str() == Some(item.kind.as_str()),
        "source" => value.as_str() == Some(item.source.as_str()),
        _ => true,
    })
}

type CacheKey = (String, String, String, Option<String>);

/// [`ChunkCacheRepo`] backed by a single-flight in-process map.
///
/// "Single-flight" here means concurrent readers for the same key observe
/// either a full cached entry or none; writers replace the full entry for
/// a key atomically under one lock acquisition, so no caller can observe
/// a partially written set of chunk rows.
#[derive(Default)]
pub struct InMemoryChunkCacheRepo {
    entries: Mutex<HashMap<CacheKey, Vec<ChunkCacheRow>>>,
}

impl InMemoryChunkCacheRepo {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cache_key(item_id: &str, content_hash: &str, chunker_id: &str, embed_model_id: Option<&str>) -> CacheKey {
    (
        item_id.to_string(),
        content_hash.to_string(),
        chunker_id.to_string(),
        embed_model_id.map(ToString::to_string),
    )
}

#[async_trait]
impl ChunkCacheRepo for InMemoryChunkCacheRepo {
    async fn get_cached_chunks(
        &self,
        item_id: &str,
        content_hash: &str,
        chunker_id: &str,
        embed_model_id: Option<&str>,
    ) -> Vec<ChunkCacheRow> {
        let key = cache_key(item_id, content_hash, chunker_id, embed_model_id);
        self.entries.lock().await.get(&key).cloned().unwrap_or_default()
    }

    async fn write_cached_chunks(
        &self,
        item_id: &str,
        _owner_user_id: &str,
        content_hash: &str,
        chunker_id: &str,
        embed_model_id: Option<&str>,
        rows: &[ChunkCacheRow],
    ) {
        if rows.is_empty() {
            return;
        }
        let key = cache_key(item_id, content_hash, chunker_id, embed_model_id);
        // Conflicts on the unique key do nothing: first writer wins, so a
        // racing retry observes the already-cached rows instead of clobbering them.
        self.entries.lock().await.entry(key).or_insert_with(|| rows.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::embedder::DeterministicEmbedder;

    #[tokio::test]
    async fn test_search_fts_ranks_by_term_overlap() {
        let embedder = DeterministicEmbedder::default();
        let items = vec![
            KbItem::new("a", "owner-1", "doc", "kb", "rust async runtimes are great"),
            KbItem::new("b", "owner-1", "doc", "kb", "nothing related here"),
        ];
        let repo = InMemoryItemRepo::new(items, &embedder).await;
        let prefs = RetrievalPrefs::new("rust async");
        let results = repo.search_fts("rust async", &prefs).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(results[0].0, "a");
    }

    #[tokio::test]
    async fn test_search_vec_returns_wellformed_results() {
        let embedder = DeterministicEmbedder::default();
        let items = vec![KbItem::new("a", "owner-1", "doc", "kb", "hello world")];
        let repo = InMemoryItemRepo::new(items, &embedder).await;
        let query_vec = embedder.embed_query("hello world").await;
        let prefs = RetrievalPrefs::new("hello world");
        let results = repo.search_vec(&query_vec, &prefs).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1 > 0.99);
    }

    #[tokio::test]
    async fn test_chunk_cache_roundtrip() {
        let repo = InMemoryChunkCacheRepo::new();
        assert!(repo.get_cached_chunks("a", "hash", "chunker", None).await.is_empty());
        let row = ChunkCacheRow {
            item_id: "a".to_string(),
            owner_user_id: "owner-1".to_string(),
            content_hash: "hash".to_string(),
            chunker_id: "chunker".to_string(),
            embed_model_id: None,
            chunk_index: 0,
            text: "chunk".to_string(),
            start_idx: None,
            end_idx: None,
            token_count: None,
        };
        repo.write_cached_chunks("a", "owner-1", "hash", "chunker", None, &[row]).await;
        let cached = repo.get_cached_chunks("a", "hash", "chunker", None).await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].text, "chunk");
    }

    #[tokio::test]
    async fn test_write_cached_chunks_first_writer_wins() {
        let repo = InMemoryChunkCacheRepo::new();
        let first = ChunkCacheRow {
            item_id: "a".to_string(),
            owner_user_id: "owner-1".to_string(),
            content_hash: "hash".to_string(),
            chunker_id: "chunker".to_string(),
            embed_model_id: None,
            chunk_index: 0,
            text: "first".to_string(),
            start_idx: None,
            end_idx: None,
            token_count: None,
        };
        let second = ChunkCacheRow {
            text: "second".to_string(),
            ..first.clone()
        };
        repo.write_cached_chunks("a", "owner-1", "hash", "chunker", None, &[first]).await;
        repo.write_cached_chunks("a", "owner-1", "hash", "chunker", None, &[second]).await;
        let cached = repo.get_cached_chunks("a", "hash", "chunker", None).await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].text, "first");
    }
}
