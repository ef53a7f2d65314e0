//! The retriever's external contract.

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::protocol::context::RequestContext;

use super::models::{RetrievalBundle, RetrievalPrefs};

/// Runs one retrieval call for a request.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Executes lexical + vector search, fusion, and late chunking, honoring
    /// `ctx`'s cancellation signal at each suspension point.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Cancelled`] if cancellation is observed,
    /// or [`OrchestratorError::InvalidArgument`] if `prefs` are rejected
    /// (e.g. `fts.mode = strict` without `allow_strict`).
    async fn search(
        &self,
        ctx: &RequestContext,
        prefs: &RetrievalPrefs,
    ) -> Result<RetrievalBundle, OrchestratorError>;
}
