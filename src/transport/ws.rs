//! WebSocket front-end: one connection, one request, one event stream.
//!
//! Thin by design — the wire framing here exists to demonstrate the core
//! against a real transport, not to be a production API gateway. Mirrors
//! the teacher's `mcp/transport.rs` shape: an `axum::Router` bound with
//! `tokio::net::TcpListener`, graceful shutdown driven by a
//! `tokio_util::sync::CancellationToken`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::protocol::context::{ConversationWindow, ProductProfile, RequestContext, UserInput};
use crate::protocol::event_sink::EventSink;
use crate::protocol::events::EventEnvelope;

/// One inbound request frame: the client's first WebSocket text message.
#[derive(Debug, Deserialize)]
struct RequestFrame {
    request_id: String,
    user_input: UserInput,
    #[serde(default)]
    conversation: ConversationWindow,
    #[serde(default)]
    product_profile: ProductProfile,
}

/// Shared application state handed to every connection handler.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wraps an orchestrator for use as `axum` router state.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Builds the demo router: a single `/ws` upgrade endpoint.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drives one connection: reads exactly one request frame, runs it to
/// completion, and forwards every emitted event as a JSON text frame.
///
/// A second inbound text message (any content) cancels the in-flight
/// request instead of starting a new one; this connection serves one
/// request at a time.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let Some(Ok(Message::Text(raw))) = receiver.next().await else {
        debug!("websocket closed before a request frame arrived");
        return;
    };
    let frame: RequestFrame = match serde_json::from_str(&raw) {
        Ok(frame) => frame,
        Err(err) => {
            let _ = sender.send(Message::Text(error_frame(&err.to_string()).into())).await;
            return;
        }
    };

    let RequestFrame {
        request_id,
        user_input,
        conversation,
        product_profile,
    } = frame;

    let ctx = RequestContext::new(request_id);
    let cancel_ctx = ctx.clone();
    let cancel_token = CancellationToken::new();
    let cancel_child = cancel_token.clone();

    let (tx, mut rx) = mpsc::unbounded_channel::<EventEnvelope>();
    let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink { tx });

    let orchestrator = Arc::clone(&state.orchestrator);
    let run_ctx = ctx.clone();
    let run_handle = tokio::spawn(async move {
        orchestrator.run(&run_ctx, &user_input, &conversation, &product_profile, sink).await;
    });

    let watchdog = tokio::spawn(async move {
        tokio::select! {
            () = cancel_child.cancelled() => {}
            next_message = receiver.next() => {
                if next_message.is_some() {
                    cancel_ctx.cancel();
                }
            }
        }
    });

    while let Some(event) = rx.recv().await {
        let Ok(json) = serde_json::to_string(&event) else {
            warn!("failed to serialize event envelope");
            continue;
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            ctx.cancel();
            break;
        }
    }

    cancel_token.cancel();
    let _ = run_handle.await;
    let _ = watchdog.await;
    let _ = sender.close().await;
}

fn error_frame(message: &str) -> String {
    let env = EventEnvelope::new(
        "rag.error",
        "unknown",
        1,
        Some(std::collections::HashMap::from([(
            "message".to_string(),
            serde_json::Value::String(message.to_string()),
        )])),
    );
    serde_json::to_string(&env).unwrap_or_else(|_| "{}".to_string())
}

/// [`EventSink`] that forwards envelopes to an unbounded channel, read by
/// the connection's send loop.
struct ChannelEventSink {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: EventEnvelope) {
        if self.tx.send(event).is_err() {
            warn!("event dropped: receiving connection already closed");
        }
    }
}

/// Serves the demo router on `addr`, shutting down gracefully on `ctrl_c`.
///
/// # Errors
/// Returns an error if the listener fails to bind or the server hits a
/// runtime I/O error.
pub async fn serve(addr: &str, orchestrator: Arc<Orchestrator>) -> Result<(), OrchestratorError> {
    let app = router(AppState::new(orchestrator));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OrchestratorError::unexpected(format!("bind {addr}: {e}")))?;

    tracing::info!(%addr, "rag-orchestrator websocket transport listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| OrchestratorError::unexpected(format!("serve: {e}")))
}
