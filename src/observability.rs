//! Structured logging setup.
//!
//! One call, made once at process start, wires `tracing` output to stderr
//! with a level filter controlled by `RUST_LOG` (falling back to `info`).
//! Everything downstream — the router, the step runner, the retriever —
//! emits through the `tracing` macros and never touches this module again.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber.
///
/// Safe to call at most once per process; a second call returns an error
/// which callers may safely ignore (tests and doctests may each try to
/// install their own subscriber).
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
