//! In-memory chunker lookup by id or alias.

use std::collections::HashMap;

use crate::error::OrchestratorError;

use super::protocols::{Chunker, ChunkerRegistry};
use super::simple_char::SimpleCharChunker;
use super::simple_token::SimpleTokenChunker;

/// [`ChunkerRegistry`] backed by a fixed in-process map.
///
/// Ships the two reference chunkers pre-registered, with `"default"`
/// aliased to the token chunker, matching the original service's bundled
/// registry.
pub struct InMemoryChunkerRegistry {
    chunkers: HashMap<String, Box<dyn Chunker>>,
    aliases: HashMap<String, String>,
}

impl InMemoryChunkerRegistry {
    /// Builds a registry with the default chunker set and alias table.
    #[must_use]
    pub fn new() -> Self {
        let token = SimpleTokenChunker::new();
        let char_chunker = SimpleCharChunker::new();
        let mut chunkers: HashMap<String, Box<dyn Chunker>> = HashMap::new();
        let token_id = token.chunker_id().to_string();
        chunkers.insert(token_id.clone(), Box::new(token));
        chunkers.insert(char_chunker.chunker_id().to_string(), Box::new(char_chunker));

        let mut aliases = HashMap::new();
        aliases.insert("default".to_string(), token_id);

        Self { chunkers, aliases }
    }
}

impl Default for InMemoryChunkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkerRegistry for InMemoryChunkerRegistry {
    fn get(&self, chunker_id: &str) -> Result<&dyn Chunker, OrchestratorError> {
        let resolved = self.aliases.get(chunker_id).map_or(chunker_id, String::as_str);
        self.chunkers
            .get(resolved)
            .map(AsRef::as_ref)
            .ok_or_else(|| OrchestratorError::invalid_argument(format!("chunker not found: {chunker_id}")))
    }

    fn has(&self, chunker_id: &str) -> bool {
        let resolved = self.aliases.get(chunker_id).map_or(chunker_id, String::as_str);
        self.chunkers.contains_key(resolved)
    }

    fn list_ids(&self) -> Vec<String> {
        self.chunkers
            .keys()
            .cloned()
            .chain(self.aliases.keys().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_alias() {
        let registry = InMemoryChunkerRegistry::new();
        assert!(registry.get("default").is_ok());
        assert!(registry.list_ids().contains(&"simple_token_like@v1".to_string()));
    }

    #[test]
    fn test_registry_unknown_id() {
        let registry = InMemoryChunkerRegistry::new();
        assert!(registry.get("nope").is_err());
        assert!(!registry.has("nope"));
    }
}
