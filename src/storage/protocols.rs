//! Knowledge-base repository contracts.
//!
//! ORM mapping and schema migration are explicitly out of scope for this
//! crate; these traits are the seam a real Postgres-backed implementation
//! would sit behind. The in-memory reference implementations in
//! [`super::memory`] exist to make the retrieval pipeline exercisable
//! without one.

use async_trait::async_trait;

use crate::retriever::models::RetrievalPrefs;

use super::models::{ChunkCacheRow, KbItem};

/// Looks up and searches knowledge-base items.
#[async_trait]
pub trait ItemRepo: Send + Sync {
    /// Lexical search: returns `(item_id, rank)` pairs ranked by
    /// term-overlap against `prefs.fts`.
    ///
    /// # Errors
    /// Returns an error if `prefs.fts.mode` is rejected (e.g. `strict`
    /// without `allow_strict`).
    async fn search_fts(
        &self,
        query_text: &str,
        prefs: &RetrievalPrefs,
    ) -> Result<Vec<(String, f64)>, crate::error::OrchestratorError>;

    /// Vector search: returns `(item_id, cosine_similarity)` pairs against
    /// `query_vec`. Always returns a well-formed (possibly empty) result;
    /// never short-circuits fusion by design.
    async fn search_vec(&self, query_vec: &[f64], prefs: &RetrievalPrefs) -> Vec<(String, f64)>;

    /// Fetches full item rows for the given ids, in no particular order.
    async fn fetch_items_by_ids(&self, item_ids: &[String]) -> Vec<KbItem>;
}

/// Single-flight cache for late-chunked evidence.
#[async_trait]
pub trait ChunkCacheRepo: Send + Sync {
    /// Returns cached rows matching the full key, or an empty vector on a
    /// cache miss.
    async fn get_cached_chunks(
        &self,
        item_id: &str,
        content_hash: &str,
        chunker_id: &str,
        embed_model_id: Option<&str>,
    ) -> Vec<ChunkCacheRow>;

    /// Writes `rows` under the key `(item_id, content_hash, chunker_id,
    /// embed_model_id)`. Atomic in one transaction; conflicts on the unique
    /// key do nothing, so a racing retry with the same key is idempotent.
    /// Safe to call with an empty slice.
    async fn write_cached_chunks(
        &self,
        item_id: &str,
        owner_user_id: &str,
        content_hash: &str,
        chunker_id: &str,
        embed_model_id: Option<&str>,
        rows: &[ChunkCacheRow],
    );
}
