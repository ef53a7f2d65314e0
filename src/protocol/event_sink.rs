//! Outbound event delivery contract.

use async_trait::async_trait;

use super::events::EventEnvelope;

/// Delivers ordered events to whatever transport owns the request.
///
/// A single method, mirroring the teacher's narrow single-purpose trait
/// shape (e.g. `LlmProvider::chat`). Implementations must not reorder or
/// drop events; the orchestrator relies on `emit` being called exactly
/// once per envelope, in the order the envelopes are produced.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event. Errors are swallowed by callers that treat the
    /// sink as best-effort (e.g. a disconnected websocket); the orchestrator
    /// itself does not retry a failed emit.
    async fn emit(&self, event: EventEnvelope);
}

/// Sink that records every envelope it receives, for tests and the demo
/// binary's non-transport code paths.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: tokio::sync::Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events recorded so far, in emit order.
    pub async fn snapshot(&self) -> Vec<EventEnvelope> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: EventEnvelope) {
        self.events.lock().await.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_preserves_order() {
        let sink = RecordingEventSink::new();
        for seq in 1..=3 {
            sink.emit(EventEnvelope::new("rag.token", "req-1", seq, None))
                .await;
        }
        let events = sink.snapshot().await;
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
