//! Runs individual [`PlanStep`]s, dispatching on [`PlanStepKind`].

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::OrchestratorError;
use crate::evidence::{DefaultEvidencePacker, EvidencePackOptions, EvidencePacker};
use crate::protocol::context::{RequestContext, UserInput};
use crate::protocol::plans::{PlanStep, PlanStepKind};
use crate::retriever::{RetrievalBundle, RetrievalPrefs, Retriever};

use super::emitter::Emitter;
use super::interfaces::{AgentResult, AgentRunner, SynthesisRuntime, ToolResult, ToolRunner, Validator};

/// The terminal status of one step, used by the orchestrator to decide
/// whether dependent steps may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step ran and succeeded.
    Completed,
    /// The step ran and failed.
    Failed,
    /// The step was never run because a dependency failed.
    Skipped,
}

/// Accumulated output of every step run so far in one plan execution.
#[derive(Debug, Default)]
pub struct StepState {
    /// Retrieval output, set once a `retrieve` step completes.
    pub retrieval: Option<RetrievalBundle>,
    /// Tool call outputs, in completion order.
    pub tool_results: Vec<ToolResult>,
    /// Agent run outputs, in completion order.
    pub agent_results: Vec<AgentResult>,
    /// Arbitrary per-step results, keyed by `step_id`, for steps downstream
    /// in the same plan (e.g. `emit_results`) to read back.
    pub results_payload: HashMap<String, Value>,
}

/// Dispatches each [`PlanStep`] to its collaborator and reports a
/// [`StepStatus`].
pub struct StepRunner {
    retriever: Arc<dyn Retriever>,
    synthesis_runtime: Arc<dyn SynthesisRuntime>,
    tool_runner: Arc<dyn ToolRunner>,
    agent_runner: Arc<dyn AgentRunner>,
    validator: Arc<dyn Validator>,
    evidence_packer: Arc<dyn EvidencePacker>,
}

impl StepRunner {
    /// Builds a step runner from its collaborators.
    #[must_use]
    pub fn new(
        retriever: Arc<dyn Retriever>,
        synthesis_runtime: Arc<dyn SynthesisRuntime>,
        tool_runner: Arc<dyn ToolRunner>,
        agent_runner: Arc<dyn AgentRunner>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            retriever,
            synthesis_runtime,
            tool_runner,
            agent_runner,
            validator,
            evidence_packer: Arc::new(DefaultEvidencePacker::new()),
        }
    }

    /// Runs one step, dispatching by `step.kind`.
    ///
    /// # Errors
    /// Propagates [`OrchestratorError::Cancelled`] observed during
    /// retrieval or synthesis.
    pub async fn run_step(
        &self,
        ctx: &RequestContext,
        step: &PlanStep,
        user_input: &UserInput,
        state: &mut StepState,
        emitter: &Emitter,
    ) -> Result<StepStatus, OrchestratorError> {
        debug!(step_id = %step.step_id, kind = ?step.kind, "step dispatched");

        let result = match step.kind {
            PlanStepKind::Retrieve => self.run_retrieve(ctx, step, user_input, state, emitter).await,
            PlanStepKind::ToolCall => Ok(self.run_tool_call(ctx, step, state).await),
            PlanStepKind::AgentRun => Ok(self.run_agent_run(ctx, step, state).await),
            PlanStepKind::Validate => Ok(self.run_validate(ctx, step, state).await),
            PlanStepKind::Synthesize => self.run_synthesize(ctx, user_input, state, emitter).await,
            PlanStepKind::EmitResults => {
                emitter.emit("rag.results", Some(step.params.clone())).await;
                Ok(StepStatus::Completed)
            }
            PlanStepKind::Finalize => Ok(StepStatus::Completed),
        };

        match &result {
            Ok(status) => debug!(step_id = %step.step_id, ?status, "step result"),
            Err(OrchestratorError::Cancelled) => warn!(step_id = %step.step_id, "cancellation observed"),
            Err(err) => warn!(step_id = %step.step_id, error = %err, "step result"),
        }
        result
    }

    async fn run_retrieve(
        &self,
        ctx: &RequestContext,
        step: &PlanStep,
        user_input: &UserInput,
        state: &mut StepState,
        emitter: &Emitter,
    ) -> Result<StepStatus, OrchestratorError> {
        let mut prefs = parse_retrieval_prefs(step, user_input)?;
        if prefs.query_text.is_empty() {
            prefs.query_text = user_input.text.clone();
        }
        let bundle = self.retriever.search(ctx, &prefs).await?;
        let sources = self.evidence_packer.pack(&bundle.candidates, Some(&bundle.evidence), &EvidencePackOptions::default());
        let mut payload = HashMap::new();
        payload.insert(
            "sources".to_string(),
            serde_json::to_value(sources).unwrap_or(Value::Array(Vec::new())),
        );
        emitter.emit("rag.sources", Some(payload)).await;
        state.retrieval = Some(bundle);
        Ok(StepStatus::Completed)
    }

    async fn run_tool_call(&self, ctx: &RequestContext, step: &PlanStep, state: &mut StepState) -> StepStatus {
        let result = self.tool_runner.call(ctx, &step.params).await;
        let status = if result.success { StepStatus::Completed } else { StepStatus::Failed };
        state.results_payload.insert(
            step.step_id.clone(),
            serde_json::to_value(&result).unwrap_or(Value::Null),
        );
        state.tool_results.push(result);
        status
    }

    async fn run_agent_run(&self, ctx: &RequestContext, step: &PlanStep, state: &mut StepState) -> StepStatus {
        let result = self.agent_runner.run(ctx, &step.params).await;
        let status = if result.success { StepStatus::Completed } else { StepStatus::Failed };
        state.results_payload.insert(
            step.step_id.clone(),
            serde_json::to_value(&result).unwrap_or(Value::Null),
        );
        state.agent_results.push(result);
        status
    }

    async fn run_validate(&self, ctx: &RequestContext, step: &PlanStep, state: &mut StepState) -> StepStatus {
        let result = self.validator.validate(ctx, &step.params).await;
        let status = if result.success { StepStatus::Completed } else { StepStatus::Failed };
        state.results_payload.insert(
            step.step_id.clone(),
            serde_json::to_value(&result).unwrap_or(Value::Null),
        );
        status
    }

    async fn run_synthesize(
        &self,
        ctx: &RequestContext,
        user_input: &UserInput,
        state: &mut StepState,
        emitter: &Emitter,
    ) -> Result<StepStatus, OrchestratorError> {
        let mut stream = self
            .synthesis_runtime
            .stream_answer(ctx, user_input, state.retrieval.as_ref(), &state.tool_results)
            .await;

        let mut tokens = Vec::new();
        while let Some(token) = stream.next().await {
            if ctx.cancelled() {
                return Err(OrchestratorError::Cancelled);
            }
            let mut payload = HashMap::new();
            payload.insert("token".to_string(), Value::String(token.clone()));
            emitter.emit("rag.token", Some(payload)).await;
            tokens.push(token);
        }
        if !tokens.is_empty() {
            let mut payload = HashMap::new();
            payload.insert("message".to_string(), Value::String(tokens.concat()));
            emitter.emit("rag.message", Some(payload)).await;
        }
        Ok(StepStatus::Completed)
    }
}

fn parse_retrieval_prefs(step: &PlanStep, user_input: &UserInput) -> Result<RetrievalPrefs, OrchestratorError> {
    let raw = step
        .params
        .get("retrieval_prefs")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let mut raw = match raw {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    raw.entry("query_text")
        .or_insert_with(|| Value::String(user_input.text.clone()));
    serde_json::from_value(Value::Object(raw))
        .map_err(|e| OrchestratorError::invalid_argument(format!("invalid retrieval_prefs: {e}")))
}
