//! Chunker and chunker-registry contracts.

use super::model::{Chunk, ChunkingOptions};

/// Splits a document's text into [`Chunk`]s.
///
/// Pure and synchronous: chunking is CPU-bound text slicing, not I/O, so
/// unlike the retriever and storage contracts this trait is not `async`.
pub trait Chunker: Send + Sync {
    /// Stable identifier for this chunking strategy, e.g. `"simple_char@v1"`.
    fn chunker_id(&self) -> &str;

    /// Splits `text` according to `options`. Returns an empty vector for
    /// empty input; never panics on malformed options, falling back to
    /// built-in defaults instead.
    fn chunk(&self, text: &str, options: &ChunkingOptions) -> Vec<Chunk>;
}

/// Looks up chunkers by id or alias.
pub trait ChunkerRegistry: Send + Sync {
    /// Resolves `chunker_id` (or an alias of it) to a chunker.
    ///
    /// # Errors
    /// Returns an error if neither the id nor any alias resolves to a
    /// registered chunker.
    fn get(&self, chunker_id: &str) -> Result<&dyn Chunker, crate::error::OrchestratorError>;

    /// Returns `true` if `chunker_id` (or an alias of it) is registered.
    fn has(&self, chunker_id: &str) -> bool;

    /// Lists every registered id and alias.
    fn list_ids(&self) -> Vec<String>;
}
