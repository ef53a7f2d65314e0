//! Demo binary: wires the in-memory reference collaborators together and
//! serves the orchestrator over a WebSocket.
//!
//! Not a production deployment — the knowledge base is a handful of
//! hardcoded [`KbItem`]s, and every collaborator beyond the plan execution
//! engine itself is a stub or in-memory reference implementation. See
//! `config.rs` for where a real storage backend's DSN would be read.

use std::sync::Arc;

use rag_orchestrator::chunker::InMemoryChunkerRegistry;
use rag_orchestrator::config::Settings;
use rag_orchestrator::orchestrator::{Orchestrator, StepRunner};
use rag_orchestrator::orchestrator::stubs::{EchoSynthesisRuntime, StubAgentRunner, StubToolRunner, StubValidator};
use rag_orchestrator::retriever::{DeterministicEmbedder, HybridRetriever};
use rag_orchestrator::router::DefaultDecisionRouter;
use rag_orchestrator::storage::memory::{InMemoryChunkCacheRepo, InMemoryItemRepo};
use rag_orchestrator::storage::KbItem;
use rag_orchestrator::transport;

fn seed_items() -> Vec<KbItem> {
    vec![
        KbItem::new(
            "item-1",
            "demo-tenant",
            "doc",
            "handbook",
            "Our refund policy allows returns within thirty days of purchase, provided the item is unused.",
        ),
        KbItem::new(
            "item-2",
            "demo-tenant",
            "faq",
            "handbook",
            "Shipping takes three to five business days domestically, longer for international orders.",
        ),
        KbItem::new(
            "item-3",
            "demo-tenant",
            "doc",
            "handbook",
            "Support tickets are triaged within one business day; urgent tickets are escalated immediately.",
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rag_orchestrator::observability::init_tracing().ok();

    let settings = Settings::from_env();
    tracing::info!(bind_addr = %settings.bind_addr, "starting rag-orchestrator demo");

    let embedder = Arc::new(DeterministicEmbedder::new(16));
    let item_repo = Arc::new(InMemoryItemRepo::new(seed_items(), embedder.as_ref()).await);
    let chunk_cache_repo = Arc::new(InMemoryChunkCacheRepo::default());
    let chunker_registry = Arc::new(InMemoryChunkerRegistry::new());

    let retriever = Arc::new(HybridRetriever::new(item_repo, chunker_registry, embedder, chunk_cache_repo));

    let step_runner = StepRunner::new(
        retriever,
        Arc::new(EchoSynthesisRuntime),
        Arc::new(StubToolRunner),
        Arc::new(StubAgentRunner),
        Arc::new(StubValidator),
    );
    let orchestrator = Arc::new(Orchestrator::new(Arc::new(DefaultDecisionRouter::new()), step_runner));

    transport::serve(&settings.bind_addr, orchestrator).await?;
    Ok(())
}
