//! Per-request context and inbound user input.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Per-request identity, start time, and cancellation signal.
///
/// Created on request admission, discarded when the orchestration task
/// terminates. Never shared across requests — each inbound request gets
/// its own [`RequestContext`], but the [`CancellationToken`] it wraps may
/// be cloned freely within that one request's task tree (teacher
/// convention: `tokio_util::sync::CancellationToken` is already used this
/// way for graceful shutdown in `mcp/transport.rs`).
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque string, unique per request.
    pub request_id: String,
    /// Optional distributed tracing identifier.
    pub trace_id: Option<String>,
    /// Wall-clock start time, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    /// Free-form request metadata.
    pub metadata: HashMap<String, Value>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates a new context for `request_id`, starting the clock now.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            trace_id: None,
            started_at_ms: now_ms(),
            metadata: HashMap::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Returns `true` if cancellation has been observed for this request.
    ///
    /// Cheap, non-blocking: backed by an atomic flag inside
    /// [`CancellationToken`].
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Sets the cancellation flag. Idempotent.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Awaits cancellation without polling, for suspension points that can
    /// race a cancel against other async work (e.g. `tokio::select!`).
    pub async fn cancelled_signal(&self) {
        self.cancellation.cancelled().await;
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Client-provided input for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    /// Raw user query text.
    pub text: String,
    /// Dispatch mode: `chat`, `rag`, `tool`, or `hybrid`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Free-form input metadata (e.g. `tool` for `mode = "tool"`/`"hybrid"`).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Raw retrieval preference overrides, materialized by the `retrieve`
    /// step handler into a [`crate::retriever::models::RetrievalPrefs`].
    #[serde(default)]
    pub retrieval_prefs: Option<HashMap<String, Value>>,
    /// Debug flag, threaded into retrieval stats population.
    #[serde(default)]
    pub debug: bool,
}

fn default_mode() -> String {
    "chat".to_string()
}

impl UserInput {
    /// Convenience constructor for tests and simple callers.
    #[must_use]
    pub fn new(text: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: mode.into(),
            metadata: HashMap::new(),
            retrieval_prefs: None,
            debug: false,
        }
    }
}

/// Lightweight conversation history, if the caller supplies one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationWindow {
    /// Prior turns, as opaque JSON objects (role/content shape is owned by
    /// the transport, not the core).
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Product or surface profile hints passed to the decision router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductProfile {
    /// Product/surface name.
    #[serde(default = "default_profile_name")]
    pub name: String,
    /// Free-form profile metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl Default for ProductProfile {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            metadata: HashMap::new(),
        }
    }
}
