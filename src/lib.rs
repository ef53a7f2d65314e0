//! Streaming retrieval-augmented generation orchestrator.
//!
//! Three subsystems compose around a shared event envelope:
//!
//! - [`orchestrator`]: dependency-ordered plan execution with strictly
//!   ordered event emission and cooperative cancellation.
//! - [`retriever`]: hybrid lexical+vector retrieval, late chunking, and a
//!   single-flight chunk cache.
//! - [`evidence`]: deterministic candidate/chunk packing into a bounded
//!   source list.
//!
//! [`router`] maps inbound requests to execution plans; [`protocol`] holds
//! the wire-facing types shared across all of the above; [`storage`] is
//! the knowledge-base seam; [`transport`] is a thin demo front-end.

pub mod chunker;
pub mod config;
pub mod error;
pub mod evidence;
pub mod observability;
pub mod orchestrator;
pub mod protocol;
pub mod retriever;
pub mod router;
pub mod storage;
pub mod transport;

pub use error::OrchestratorError;
