//! Knowledge-base storage contracts and an in-memory reference backend.
//!
//! ORM mapping, schema migration, and DSN-based connection management are
//! out of scope for this crate; see [`protocols`] for the seam a real
//! backend implements.

pub mod memory;
pub mod models;
pub mod protocols;

pub use memory::{InMemoryChunkCacheRepo, InMemoryItemRepo};
pub use models::{ChunkCacheRow, KbItem};
pub use protocols::{ChunkCacheRepo, ItemRepo};
