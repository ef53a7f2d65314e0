//! Hybrid retrieval: lexical+vector fusion and late chunking.

pub mod embedder;
pub mod hybrid_retriever;
pub mod hybrid_scorer;
pub mod models;
pub mod protocols;
pub mod stub;
pub mod tsquery;

pub use embedder::{DeterministicEmbedder, Embedder};
pub use hybrid_retriever::HybridRetriever;
pub use hybrid_scorer::{HybridScore, HybridScorer};
pub use models::{CandidateItem, EvidenceChunk, RetrievalBundle, RetrievalPrefs, RetrievalStats};
pub use protocols::Retriever;
pub use stub::EmptyRetriever;
