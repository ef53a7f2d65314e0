//! Reference collaborator stubs, for chat-only plans and tests.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use crate::protocol::context::{RequestContext, UserInput};
use crate::retriever::RetrievalBundle;

use super::interfaces::{AgentResult, AgentRunner, SynthesisRuntime, ToolResult, ToolRunner, ValidationResult, Validator};

/// Streams the user's own input back, token by token, with a small delay
/// between tokens so cancellation mid-stream is actually observable.
#[derive(Debug, Default)]
pub struct EchoSynthesisRuntime;

#[async_trait]
impl SynthesisRuntime for EchoSynthesisRuntime {
    async fn stream_answer(
        &self,
        _ctx: &RequestContext,
        user_input: &UserInput,
        _retrieval: Option<&RetrievalBundle>,
        _tool_results: &[ToolResult],
    ) -> Pin<Box<dyn Stream<Item = String> + Send>> {
        let tokens: Vec<String> = user_input.text.split_whitespace().map(ToString::to_string).collect();
        let stream = tokio_stream::iter(tokens).then(|token| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            format!("{token} ")
        });
        Box::pin(stream)
    }
}

/// Echoes the requested tool name as a successful, no-op call.
#[derive(Debug, Default)]
pub struct StubToolRunner;

#[async_trait]
impl ToolRunner for StubToolRunner {
    async fn call(&self, _ctx: &RequestContext, step_params: &HashMap<String, Value>) -> ToolResult {
        let tool_name = step_params
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or("stub_tool")
            .to_string();
        let mut output = HashMap::new();
        output.insert("echo".to_string(), Value::Bool(true));
        ToolResult {
            tool_name,
            output,
            success: true,
        }
    }
}

/// Always-succeeds agent run placeholder.
#[derive(Debug, Default)]
pub struct StubAgentRunner;

#[async_trait]
impl AgentRunner for StubAgentRunner {
    async fn run(&self, _ctx: &RequestContext, _step_params: &HashMap<String, Value>) -> AgentResult {
        let mut output = HashMap::new();
        output.insert("note".to_string(), Value::String("agent run placeholder".to_string()));
        AgentResult {
            agent_name: "stub_agent".to_string(),
            output,
            success: true,
        }
    }
}

/// Always-succeeds validator placeholder.
#[derive(Debug, Default)]
pub struct StubValidator;

#[async_trait]
impl Validator for StubValidator {
    async fn validate(&self, _ctx: &RequestContext, _step_params: &HashMap<String, Value>) -> ValidationResult {
        let mut details = HashMap::new();
        details.insert("note".to_string(), Value::String("validation stub".to_string()));
        ValidationResult {
            success: true,
            details,
        }
    }
}
