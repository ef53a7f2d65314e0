//! No-op retriever for chat-only plans that never reach a `retrieve` step.

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::protocol::context::RequestContext;

use super::models::{RetrievalBundle, RetrievalPrefs};
use super::protocols::Retriever;

/// Returns an empty [`RetrievalBundle`] unconditionally.
#[derive(Debug, Default)]
pub struct EmptyRetriever;

#[async_trait]
impl Retriever for EmptyRetriever {
    async fn search(
        &self,
        _ctx: &RequestContext,
        _prefs: &RetrievalPrefs,
    ) -> Result<RetrievalBundle, OrchestratorError> {
        Ok(RetrievalBundle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_retriever_returns_empty_bundle() {
        let retriever = EmptyRetriever;
        let ctx = RequestContext::new("req-1");
        let bundle = retriever
            .search(&ctx, &RetrievalPrefs::new("query"))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(bundle.candidates.is_empty());
        assert!(bundle.evidence.is_empty());
    }
}
