//! Execution plans: the decision router's output, the step runner's input.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of work a plan step performs.
///
/// Closed set, matching the seven handlers the orchestrator core ships.
/// New kinds require a new handler registration, not a string extension
/// point — unlike `UserInput::mode`, which stays a string for forward
/// compatibility with router-side dispatch logic outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepKind {
    /// Runs the hybrid retrieval pipeline and evidence packer.
    Retrieve,
    /// Invokes an external tool collaborator.
    ToolCall,
    /// Runs an LLM/agent turn.
    AgentRun,
    /// Validates upstream step output against a schema or invariant.
    Validate,
    /// Synthesizes a final answer from prior step outputs.
    Synthesize,
    /// Emits intermediate or final results to the event sink.
    EmitResults,
    /// Performs end-of-request bookkeeping.
    Finalize,
}

/// One node in an [`ExecutionPlan`]'s dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique id within the plan; referenced by other steps' `depends_on`.
    pub step_id: String,
    /// The handler this step dispatches to.
    pub kind: PlanStepKind,
    /// Whether a failure here halts the plan (`true`) or is merely recorded
    /// and skipped over (`false`).
    pub required: bool,
    /// Step ids that must reach a terminal state before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Handler-specific parameters, opaque to the step runner.
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

impl PlanStep {
    /// Convenience constructor for a required step with no dependencies.
    #[must_use]
    pub fn new(step_id: impl Into<String>, kind: PlanStepKind) -> Self {
        Self {
            step_id: step_id.into(),
            kind,
            required: true,
            depends_on: Vec::new(),
            params: HashMap::new(),
        }
    }

    /// Marks this step optional: failure is recorded but does not halt the
    /// plan.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Adds dependency edges.
    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Sets handler parameters.
    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = params;
        self
    }
}

/// A dependency-ordered set of steps produced by the decision router for
/// one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Opaque plan identifier, distinct from the request id so a router
    /// can reuse a cached plan shape across requests.
    pub plan_id: String,
    /// Steps, in router-authored order. The step runner topologically
    /// sorts by `depends_on`; this field's order is not itself a
    /// scheduling guarantee.
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Builds a plan from a plan id and a step list.
    #[must_use]
    pub fn new(plan_id: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            plan_id: plan_id.into(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_step_builders() {
        let step = PlanStep::new("retrieve", PlanStepKind::Retrieve)
            .optional()
            .depends_on(["validate_input"]);
        assert!(!step.required);
        assert_eq!(step.depends_on, vec!["validate_input".to_string()]);
    }

    #[test]
    fn test_plan_step_kind_serde() {
        let json = serde_json::to_string(&PlanStepKind::ToolCall).unwrap_or_else(|_| unreachable!());
        assert_eq!(json, "\"tool_call\"");
    }
}
