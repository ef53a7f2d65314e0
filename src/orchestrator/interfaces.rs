//! Collaborator contracts the step runner dispatches to.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::context::{RequestContext, UserInput};
use crate::retriever::RetrievalBundle;

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that ran.
    pub tool_name: String,
    /// Tool-specific output payload.
    pub output: HashMap<String, Value>,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Outcome of one agent turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Name of the agent that ran.
    pub agent_name: String,
    /// Agent-specific output payload.
    pub output: HashMap<String, Value>,
    /// Whether the run succeeded.
    pub success: bool,
}

/// Outcome of a validation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub success: bool,
    /// Validation diagnostics.
    pub details: HashMap<String, Value>,
}

/// Streams the final answer for a `synthesize` step, one token at a time.
#[async_trait]
pub trait SynthesisRuntime: Send + Sync {
    /// Begins streaming tokens for `user_input`, given retrieval and tool
    /// context accumulated so far.
    async fn stream_answer(
        &self,
        ctx: &RequestContext,
        user_input: &UserInput,
        retrieval: Option<&RetrievalBundle>,
        tool_results: &[ToolResult],
    ) -> Pin<Box<dyn Stream<Item = String> + Send>>;
}

/// Invokes an external tool for a `tool_call` step.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Calls the tool named by `step_params`.
    async fn call(&self, ctx: &RequestContext, step_params: &HashMap<String, Value>) -> ToolResult;
}

/// Runs an LLM/agent turn for an `agent_run` step.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Runs the agent named by `step_params`.
    async fn run(&self, ctx: &RequestContext, step_params: &HashMap<String, Value>) -> AgentResult;
}

/// Validates accumulated state for a `validate` step.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validates `step_params` against accumulated plan state.
    async fn validate(&self, ctx: &RequestContext, step_params: &HashMap<String, Value>) -> ValidationResult;
}
