//! Evidence packing: turns retrieval candidates and chunks into a bounded,
//! client-facing source list.

pub mod models;
pub mod packer;

pub use models::{EvidencePackOptions, OrderBy, SourceItem};
pub use packer::{DefaultEvidencePacker, EvidencePacker};
