//! Deterministic decision router: maps inbound user input to an
//! [`ExecutionPlan`].

use std::collections::HashMap;

use serde_json::Value;

use crate::protocol::context::{ConversationWindow, ProductProfile, RequestContext, UserInput};
use crate::protocol::plans::{ExecutionPlan, PlanStep, PlanStepKind};

/// Builds an [`ExecutionPlan`] from a request's mode and inputs.
///
/// Pure and deterministic: the same `(ctx, user_input, conversation,
/// product_profile)` always produces the same plan shape. `conversation`
/// and `product_profile` are threaded through for forward compatibility
/// with router policies that key off conversation history or surface
/// hints; the reference dispatch below only inspects `user_input.mode`.
pub trait DecisionRouter: Send + Sync {
    /// Builds a plan for one request.
    fn build_plan(
        &self,
        ctx: &RequestContext,
        user_input: &UserInput,
        conversation: &ConversationWindow,
        product_profile: &ProductProfile,
    ) -> ExecutionPlan;
}

/// Reference router: dispatches on `user_input.mode` into one of four
/// fixed plan shapes (`rag`, `tool`, `hybrid`, default `chat`).
#[derive(Debug, Default)]
pub struct DefaultDecisionRouter;

impl DefaultDecisionRouter {
    /// Builds a new router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionRouter for DefaultDecisionRouter {
    fn build_plan(
        &self,
        ctx: &RequestContext,
        user_input: &UserInput,
        _conversation: &ConversationWindow,
        _product_profile: &ProductProfile,
    ) -> ExecutionPlan {
        let mode = user_input.mode.to_lowercase();
        let retrieval_prefs_params = retrieval_prefs_params(user_input);
        let tool_params = tool_params(user_input);

        let steps = match mode.as_str() {
            "rag" => vec![
                PlanStep::new("retrieve", PlanStepKind::Retrieve).with_params(retrieval_prefs_params),
                PlanStep::new("synthesize", PlanStepKind::Synthesize).depends_on(["retrieve"]),
            ],
            "tool" => vec![
                PlanStep::new("tool_call", PlanStepKind::ToolCall).with_params(tool_params),
                PlanStep::new("synthesize", PlanStepKind::Synthesize).depends_on(["tool_call"]),
            ],
            "hybrid" => vec![
                PlanStep::new("retrieve", PlanStepKind::Retrieve)
                    .optional()
                    .with_params(retrieval_prefs_params),
                PlanStep::new("tool_call", PlanStepKind::ToolCall)
                    .optional()
                    .depends_on(["retrieve"])
                    .with_params(tool_params),
                PlanStep::new("synthesize", PlanStepKind::Synthesize).depends_on(["retrieve", "tool_call"]),
            ],
            _ => vec![PlanStep::new("synthesize", PlanStepKind::Synthesize)],
        };

        ExecutionPlan::new(format!("plan-{}", ctx.request_id), steps)
    }
}

fn retrieval_prefs_params(user_input: &UserInput) -> HashMap<String, Value> {
    let mut params = HashMap::new();
    let prefs = user_input.retrieval_prefs.clone().unwrap_or_default();
    params.insert(
        "retrieval_prefs".to_string(),
        serde_json::to_value(prefs).unwrap_or(Value::Object(serde_json::Map::new())),
    );
    params
}

fn tool_params(user_input: &UserInput) -> HashMap<String, Value> {
    let mut params = HashMap::new();
    let tool = user_input.metadata.get("tool").cloned().unwrap_or(Value::Null);
    params.insert("tool".to_string(), tool);
    params
}
