//! Stable event envelope emitted to clients over the event sink.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version stamped on every envelope.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Ordered, typed message addressed to a client.
///
/// `seq` is assigned exclusively by the orchestrator's single emit path —
/// no other component may construct one with a meaningful sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type, e.g. `"rag.started"`, `"rag.token"`, `"rag.done"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Protocol version, always [`PROTOCOL_VERSION`].
    pub protocol_version: String,
    /// Request this event belongs to.
    pub request_id: String,
    /// Strictly increasing sequence number within a request, starting at 1.
    pub seq: u64,
    /// Wall-clock timestamp, milliseconds since the Unix epoch.
    pub ts: u64,
    /// Event-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<HashMap<String, Value>>,
}

impl EventEnvelope {
    /// Builds a new envelope stamped with the current time.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        request_id: impl Into<String>,
        seq: u64,
        payload: Option<HashMap<String, Value>>,
    ) -> Self {
        Self {
            kind: kind.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            seq,
            ts: now_ms(),
            payload,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_roundtrip() {
        let mut payload = HashMap::new();
        payload.insert("status".to_string(), Value::String("running".to_string()));
        let env = EventEnvelope::new("rag.started", "req-1", 1, Some(payload));
        let json = serde_json::to_string(&env).unwrap_or_else(|_| unreachable!());
        assert!(json.contains("\"type\":\"rag.started\""));
        assert!(json.contains("\"protocol_version\":\"1.0\""));
        let back: EventEnvelope = serde_json::from_str(&json).unwrap_or_else(|_| unreachable!());
        assert_eq!(back.seq, 1);
        assert_eq!(back.request_id, "req-1");
    }

    #[test]
    fn test_envelope_omits_null_payload() {
        let env = EventEnvelope::new("rag.done", "req-1", 2, None);
        let json = serde_json::to_string(&env).unwrap_or_else(|_| unreachable!());
        assert!(!json.contains("payload"));
    }
}
