//! Demo transport: a thin WebSocket front-end binding [`EventSink`] to a
//! live connection.
//!
//! [`EventSink`]: crate::protocol::event_sink::EventSink

pub mod ws;

pub use ws::{serve, AppState};
