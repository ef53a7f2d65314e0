//! Plan execution engine: runs an [`ExecutionPlan`] to completion,
//! cancellation, or a required-step failure, emitting events throughout.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::OrchestratorError;
use crate::protocol::context::{ConversationWindow, ProductProfile, RequestContext, UserInput};
use crate::protocol::event_sink::EventSink;
use crate::protocol::plans::ExecutionPlan;
use crate::router::DecisionRouter;

use super::emitter::Emitter;
use super::step_runner::{StepRunner, StepState, StepStatus};

/// Runs [`ExecutionPlan`]s produced by a [`DecisionRouter`], dispatching
/// each step to a [`StepRunner`] and emitting ordered lifecycle events.
pub struct Orchestrator {
    decision_router: Arc<dyn DecisionRouter>,
    step_runner: StepRunner,
}

impl Orchestrator {
    /// Builds an orchestrator from a router and step runner.
    #[must_use]
    pub fn new(decision_router: Arc<dyn DecisionRouter>, step_runner: StepRunner) -> Self {
        Self {
            decision_router,
            step_runner,
        }
    }

    /// Runs one request end-to-end: builds a plan, executes it, and emits
    /// `rag.started`/`rag.done` (plus `rag.error` on failure) through
    /// `event_sink`.
    ///
    /// Never returns an error: every failure mode, including cancellation,
    /// is folded into a terminal `rag.done` event instead, so a transport
    /// binding never needs a second error-handling path on top of the
    /// event stream.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        user_input: &UserInput,
        conversation: &ConversationWindow,
        product_profile: &ProductProfile,
        event_sink: Arc<dyn EventSink>,
    ) {
        let emitter = Emitter::new(event_sink, ctx.request_id.clone());

        let mut started_payload = HashMap::new();
        started_payload.insert("status".to_string(), Value::String("running".to_string()));
        emitter.emit("rag.started", Some(started_payload)).await;

        let plan = self
            .decision_router
            .build_plan(ctx, user_input, conversation, product_profile);
        debug!(plan_id = %plan.plan_id, steps = plan.steps.len(), "built execution plan");

        match self.execute_plan(ctx, &plan, user_input, &emitter).await {
            Ok(()) => {
                emitter.emit("rag.done", Some(status_payload("ok"))).await;
            }
            Err(OrchestratorError::Cancelled) => {
                emitter.emit("rag.done", Some(status_payload("cancelled"))).await;
            }
            Err(OrchestratorError::RequiredStepFailed { step_id }) => {
                let mut payload = HashMap::new();
                payload.insert(
                    "message".to_string(),
                    Value::String(format!("required step failed: {step_id}")),
                );
                payload.insert("step_id".to_string(), Value::String(step_id));
                emitter.emit("rag.error", Some(payload)).await;
                emitter.emit("rag.done", Some(status_payload("error"))).await;
            }
            Err(err) => {
                let mut payload = HashMap::new();
                payload.insert("message".to_string(), Value::String(err.to_string()));
                emitter.emit("rag.error", Some(payload)).await;
                emitter.emit("rag.done", Some(status_payload("error"))).await;
            }
        }
    }

    async fn execute_plan(
        &self,
        ctx: &RequestContext,
        plan: &ExecutionPlan,
        user_input: &UserInput,
        emitter: &Emitter,
    ) -> Result<(), OrchestratorError> {
        let mut statuses: HashMap<String, StepStatus> = HashMap::new();
        let required_map: HashMap<String, bool> =
            plan.steps.iter().map(|s| (s.step_id.clone(), s.required)).collect();
        let mut state = StepState::default();

        for step in &plan.steps {
            if ctx.cancelled() {
                return Err(OrchestratorError::Cancelled);
            }
            if !dependencies_satisfied(step, &statuses, &required_map) {
                statuses.insert(step.step_id.clone(), StepStatus::Skipped);
                continue;
            }

            let status = self
                .step_runner
                .run_step(ctx, step, user_input, &mut state, emitter)
                .await?;
            statuses.insert(step.step_id.clone(), status);
            if status == StepStatus::Failed && step.required {
                return Err(OrchestratorError::RequiredStepFailed {
                    step_id: step.step_id.clone(),
                });
            }
        }
        Ok(())
    }
}

fn status_payload(status: &str) -> HashMap<String, Value> {
    let mut payload = HashMap::new();
    payload.insert("status".to_string(), Value::String(status.to_string()));
    payload
}

fn dependencies_satisfied(
    step: &crate::protocol::plans::PlanStep,
    statuses: &HashMap<String, StepStatus>,
    required_map: &HashMap<String, bool>,
) -> bool {
    step.depends_on.iter().all(|dep| match statuses.get(dep) {
        None => false,
        Some(StepStatus::Failed) => !required_map.get(dep).copied().unwrap_or(true),
        Some(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::interfaces::{AgentResult, AgentRunner, SynthesisRuntime, ToolResult, ToolRunner, ValidationResult, Validator};
    use crate::orchestrator::stubs::{EchoSynthesisRuntime, StubAgentRunner, StubToolRunner, StubValidator};
    use crate::protocol::event_sink::RecordingEventSink;
    use crate::protocol::plans::{PlanStep, PlanStepKind};
    use crate::retriever::{CandidateItem, RetrievalBundle, RetrievalPrefs, Retriever};
    use crate::router::DefaultDecisionRouter;
    use async_trait::async_trait;
    use std::pin::Pin;
    use futures_util::{Stream, StreamExt};
    use std::time::Duration;

    struct StubRetriever;

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(
            &self,
            _ctx: &RequestContext,
            _prefs: &RetrievalPrefs,
        ) -> Result<RetrievalBundle, OrchestratorError> {
            Ok(RetrievalBundle {
                candidates: vec![CandidateItem {
                    item_id: "doc1".to_string(),
                    kind: "doc".to_string(),
                    source: "kb".to_string(),
                    score: 1.0,
                    title: Some("t".to_string()),
                    summary: Some("s".to_string()),
                    ..CandidateItem::default()
                }],
                ..RetrievalBundle::default()
            })
        }
    }

    struct SingleStepRouter;

    impl DecisionRouter for SingleStepRouter {
        fn build_plan(
            &self,
            _ctx: &RequestContext,
            _user_input: &UserInput,
            _conversation: &ConversationWindow,
            _product_profile: &ProductProfile,
        ) -> ExecutionPlan {
            ExecutionPlan::new("p", vec![PlanStep::new("s1", PlanStepKind::Synthesize)])
        }
    }

    struct ToolCallThenSynthesizeRouter;

    impl DecisionRouter for ToolCallThenSynthesizeRouter {
        fn build_plan(
            &self,
            _ctx: &RequestContext,
            _user_input: &UserInput,
            _conversation: &ConversationWindow,
            _product_profile: &ProductProfile,
        ) -> ExecutionPlan {
            ExecutionPlan::new(
                "p",
                vec![
                    PlanStep::new("tool", PlanStepKind::ToolCall).optional(),
                    PlanStep::new("syn", PlanStepKind::Synthesize).depends_on(["tool"]),
                ],
            )
        }
    }

    struct ValidateThenSynthesizeRouter;

    impl DecisionRouter for ValidateThenSynthesizeRouter {
        fn build_plan(
            &self,
            _ctx: &RequestContext,
            _user_input: &UserInput,
            _conversation: &ConversationWindow,
            _product_profile: &ProductProfile,
        ) -> ExecutionPlan {
            ExecutionPlan::new(
                "p",
                vec![
                    PlanStep::new("validate", PlanStepKind::Validate),
                    PlanStep::new("syn", PlanStepKind::Synthesize).depends_on(["validate"]),
                ],
            )
        }
    }

    struct FailingToolRunner;

    #[async_trait]
    impl ToolRunner for FailingToolRunner {
        async fn call(&self, _ctx: &RequestContext, _step_params: &HashMap<String, Value>) -> ToolResult {
            ToolResult {
                tool_name: "stub_tool".to_string(),
                output: HashMap::new(),
                success: false,
            }
        }
    }

    struct FailingValidator;

    #[async_trait]
    impl Validator for FailingValidator {
        async fn validate(&self, _ctx: &RequestContext, _step_params: &HashMap<String, Value>) -> ValidationResult {
            ValidationResult {
                success: false,
                details: HashMap::new(),
            }
        }
    }

    struct SlowSynthesisRuntime;

    #[async_trait]
    impl SynthesisRuntime for SlowSynthesisRuntime {
        async fn stream_answer(
            &self,
            _ctx: &RequestContext,
            _user_input: &UserInput,
            _retrieval: Option<&RetrievalBundle>,
            _tool_results: &[ToolResult],
        ) -> Pin<Box<dyn Stream<Item = String> + Send>> {
            let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];
            let stream = tokio_stream::iter(tokens).then(|t| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                t
            });
            Box::pin(stream)
        }
    }

    fn make_runner(
        retriever: Arc<dyn Retriever>,
        synthesis: Arc<dyn SynthesisRuntime>,
        tool_runner: Arc<dyn ToolRunner>,
        validator: Arc<dyn Validator>,
    ) -> StepRunner {
        StepRunner::new(retriever, synthesis, tool_runner, Arc::new(StubAgentRunner), validator)
    }

    #[tokio::test]
    async fn test_chat_only_plan() {
        let runner = make_runner(
            Arc::new(StubRetriever),
            Arc::new(EchoSynthesisRuntime),
            Arc::new(StubToolRunner),
            Arc::new(StubValidator),
        );
        let orch = Orchestrator::new(Arc::new(DefaultDecisionRouter::new()), runner);
        let sink = Arc::new(RecordingEventSink::new());
        orch.run(
            &RequestContext::new("req-1"),
            &UserInput::new("hello world", "chat"),
            &ConversationWindow::default(),
            &ProductProfile::default(),
            sink.clone(),
        )
        .await;
        let events = sink.snapshot().await;
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds.first(), Some(&"rag.started"));
        assert_eq!(kinds.last(), Some(&"rag.done"));
        assert!(kinds.contains(&"rag.message"));
    }

    #[tokio::test]
    async fn test_retrieve_then_synthesize() {
        let runner = make_runner(
            Arc::new(StubRetriever),
            Arc::new(EchoSynthesisRuntime),
            Arc::new(StubToolRunner),
            Arc::new(StubValidator),
        );
        let orch = Orchestrator::new(Arc::new(DefaultDecisionRouter::new()), runner);
        let sink = Arc::new(RecordingEventSink::new());
        orch.run(
            &RequestContext::new("req-1"),
            &UserInput::new("query text", "rag"),
            &ConversationWindow::default(),
            &ProductProfile::default(),
            sink.clone(),
        )
        .await;
        let events = sink.snapshot().await;
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"rag.sources"));
        assert!(kinds.contains(&"rag.token"));
        let last_payload = events.last().unwrap_or_else(|| unreachable!()).payload.clone();
        assert_eq!(
            last_payload.and_then(|p| p.get("status").cloned()),
            Some(Value::String("ok".to_string()))
        );
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream() {
        let runner = make_runner(
            Arc::new(StubRetriever),
            Arc::new(SlowSynthesisRuntime),
            Arc::new(StubToolRunner),
            Arc::new(StubValidator),
        );
        let orch = Orchestrator::new(Arc::new(SingleStepRouter), runner);
        let sink = Arc::new(RecordingEventSink::new());
        let ctx = RequestContext::new("req-1");
        let ctx_clone = ctx.clone();
        let sink_clone = sink.clone();
        let handle = tokio::spawn(async move {
            orch.run(
                &ctx_clone,
                &UserInput::new("cancel me", "chat"),
                &ConversationWindow::default(),
                &ProductProfile::default(),
                sink_clone,
            )
            .await;
        });
        tokio::time::sleep(Duration::from_millis(25)).await;
        ctx.cancel();
        handle.await.unwrap_or_else(|_| unreachable!());

        let events = sink.snapshot().await;
        let last_payload = events.last().unwrap_or_else(|| unreachable!()).payload.clone();
        assert_eq!(
            last_payload.and_then(|p| p.get("status").cloned()),
            Some(Value::String("cancelled".to_string()))
        );
        assert!(!events.iter().any(|e| e.kind == "rag.error"));
    }

    #[tokio::test]
    async fn test_optional_step_failure_does_not_halt_plan() {
        let runner = make_runner(
            Arc::new(StubRetriever),
            Arc::new(EchoSynthesisRuntime),
            Arc::new(FailingToolRunner),
            Arc::new(StubValidator),
        );
        let orch = Orchestrator::new(Arc::new(ToolCallThenSynthesizeRouter), runner);
        let sink = Arc::new(RecordingEventSink::new());
        orch.run(
            &RequestContext::new("req-1"),
            &UserInput::new("hi", "chat"),
            &ConversationWindow::default(),
            &ProductProfile::default(),
            sink.clone(),
        )
        .await;
        let events = sink.snapshot().await;
        let last_payload = events.last().unwrap_or_else(|| unreachable!()).payload.clone();
        assert_eq!(
            last_payload.and_then(|p| p.get("status").cloned()),
            Some(Value::String("ok".to_string()))
        );
    }

    #[tokio::test]
    async fn test_required_step_failure_halts_plan() {
        let runner = make_runner(
            Arc::new(StubRetriever),
            Arc::new(EchoSynthesisRuntime),
            Arc::new(StubToolRunner),
            Arc::new(FailingValidator),
        );
        let orch = Orchestrator::new(Arc::new(ValidateThenSynthesizeRouter), runner);
        let sink = Arc::new(RecordingEventSink::new());
        orch.run(
            &RequestContext::new("req-1"),
            &UserInput::new("hi", "chat"),
            &ConversationWindow::default(),
            &ProductProfile::default(),
            sink.clone(),
        )
        .await;
        let events = sink.snapshot().await;
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds[kinds.len() - 2], "rag.error");
        let last_payload = events.last().unwrap_or_else(|| unreachable!()).payload.clone();
        assert_eq!(
            last_payload.and_then(|p| p.get("status").cloned()),
            Some(Value::String("error".to_string()))
        );
    }
}
