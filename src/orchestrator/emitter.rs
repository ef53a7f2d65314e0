//! Single emit path: the only code that may assign event sequence numbers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::protocol::event_sink::EventSink;
use crate::protocol::events::EventEnvelope;

/// Assigns strictly increasing `seq` numbers, starting at 1, and forwards
/// the resulting envelope to the request's event sink.
///
/// Every emitted event for a request must go through one `Emitter`
/// instance — sharing the instance (not recreating it) is what makes the
/// sequence strictly monotonic across concurrently-running step handlers.
pub struct Emitter {
    sink: Arc<dyn EventSink>,
    request_id: String,
    seq: AtomicU64,
}

impl Emitter {
    /// Builds an emitter for one request, starting its sequence at 0 (the
    /// first `emit` call produces `seq = 1`).
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, request_id: impl Into<String>) -> Self {
        Self {
            sink,
            request_id: request_id.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Emits one event of `kind` with an optional payload.
    pub async fn emit(&self, kind: &str, payload: Option<HashMap<String, Value>>) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::new(kind, self.request_id.clone(), seq, payload);
        self.sink.emit(envelope).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::event_sink::RecordingEventSink;

    #[tokio::test]
    async fn test_emitter_assigns_strictly_increasing_seq() {
        let sink = Arc::new(RecordingEventSink::new());
        let emitter = Emitter::new(sink.clone(), "req-1");
        emitter.emit("rag.started", None).await;
        emitter.emit("rag.token", None).await;
        emitter.emit("rag.done", None).await;
        let seqs: Vec<u64> = sink.snapshot().await.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
