//! Pipeline Coordinator (C9): the state machine that sequences
//! Planner → Policy Engine → Tool Runtime → Verifier → Answer Generator,
//! emitting `StreamEvent`s in the exact order spec §5 guarantees.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use serde_json::Map;

use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::domain::{Answer, ToolResult};
use crate::error::Error;
use crate::evidence_store::EvidenceStore;
use crate::llm::LlmAdapter;
use crate::stream_event::{
    ErrorPayload, MetaPayload, Stage, StatusPayload, StreamEvent, ToolCallEndPayload, ToolCallStartPayload,
};
use crate::tool_runtime::ToolRuntime;
use crate::{answer_generator, planner, policy_engine, verifier};

/// Cheap cooperative cancellation flag, checked at suspension points —
/// no `tokio-util::CancellationToken` dependency.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct PipelineCoordinator {
    llm: Arc<dyn LlmAdapter>,
    tool_runtime: Arc<ToolRuntime>,
    evidence_store: Arc<dyn EvidenceStore>,
    config: PipelineConfig,
}

impl PipelineCoordinator {
    pub fn new(
        llm: Arc<dyn LlmAdapter>,
        tool_runtime: Arc<ToolRuntime>,
        evidence_store: Arc<dyn EvidenceStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            tool_runtime,
            evidence_store,
            config,
        }
    }

    /// Run one orchestration request, yielding `StreamEvent`s as each
    /// stage completes. Dropping the stream before it's exhausted is the
    /// caller's own form of cancellation; `cancel` additionally lets a
    /// caller cancel cooperatively between suspension points while still
    /// draining already-queued events.
    pub fn run(self: Arc<Self>, ctx: RunContext, cancel: CancellationFlag) -> impl Stream<Item = StreamEvent> {
        stream! {
            yield StreamEvent::Meta(MetaPayload {
                thread_id: ctx.thread_id.to_string(),
                message_id: ctx.message_id.clone(),
            });

            if cancel.is_cancelled() {
                yield cancelled_event();
                yield StreamEvent::Done;
                return;
            }

            if !ctx.is_within_message_limit() {
                yield error_event(
                    &Error::Validation(format!(
                        "user message exceeds the {}-character limit",
                        crate::context::MAX_USER_MESSAGE_CHARS
                    )),
                    "planning",
                );
                yield StreamEvent::Done;
                return;
            }

            yield StreamEvent::Status(StatusPayload { stage: Stage::Planning });

            let system_context = format!("Allowed sources: {}", ctx.allowed_sources.join(", "));
            let plan = match planner::plan(
                self.llm.as_ref(),
                &ctx.user_message,
                &system_context,
                &self.config.allowed_tools,
                self.config.planner_temperature,
                self.config.planner_max_retries,
            )
            .await
            {
                Ok(plan) => plan,
                Err(e) => {
                    yield error_event(&e, "planning");
                    yield StreamEvent::Done;
                    return;
                }
            };

            if plan.needs_clarification {
                yield StreamEvent::Plan(plan.clone());
                let answer = Answer::absence_of_data(
                    plan.clarification_question.clone().unwrap_or_default(),
                );
                yield StreamEvent::Answer(answer);
                yield StreamEvent::Done;
                return;
            }

            yield StreamEvent::Plan(plan.clone());

            if cancel.is_cancelled() {
                yield cancelled_event();
                yield StreamEvent::Done;
                return;
            }

            yield StreamEvent::Status(StatusPayload { stage: Stage::Policy });

            let outcome = match policy_engine::evaluate(&plan, &self.config) {
                Ok(outcome) => outcome,
                Err(e) => {
                    yield error_event(&e, "policy");
                    yield StreamEvent::Done;
                    return;
                }
            };

            if !outcome.is_executable() {
                yield error_event(&Error::policy_blocked("every action in the plan was rejected"), "policy");
                yield StreamEvent::Done;
                return;
            }

            let approved_actions: Vec<(crate::domain::PlanAction, Map<String, serde_json::Value>)> = outcome
                .decisions
                .iter()
                .filter(|d| d.approved)
                .map(|d| (d.action.clone(), d.sanitized_args.clone().unwrap_or_default()))
                .collect();

            yield StreamEvent::Status(StatusPayload { stage: Stage::ToolsRunning });

            if cancel.is_cancelled() {
                yield cancelled_event();
                yield StreamEvent::Done;
                return;
            }

            let mut execution_results = Vec::with_capacity(approved_actions.len());
            for (action, sanitized_args) in &approved_actions {
                yield StreamEvent::ToolCallStart(ToolCallStartPayload {
                    tool: action.tool.clone(),
                    args: sanitized_args.clone(),
                });

                let one = self
                    .tool_runtime
                    .execute_actions(
                        std::slice::from_ref(&(action.clone(), sanitized_args.clone())),
                        &ctx,
                        Duration::from_millis(self.config.tool_timeout_ms),
                        self.config.max_rows,
                    )
                    .await;
                let result = one.into_iter().next().expect("exactly one action dispatched");

                if let Err(e) = self.evidence_store.insert_tool_call(&result.tool_call).await {
                    tracing::warn!(error = %e, "failed to persist tool call");
                }
                if let Some(tr) = &result.tool_result {
                    if let Err(e) = self.evidence_store.insert_tool_result(tr).await {
                        tracing::warn!(error = %e, "failed to persist tool result");
                    }
                }

                yield StreamEvent::ToolCallEnd(ToolCallEndPayload {
                    tool: result.tool_call.tool_name.clone(),
                    status: result.tool_call.status,
                    duration_ms: result.tool_call.duration_ms,
                    row_count: result.tool_result.as_ref().and_then(|r| r.row_count),
                    error: result.tool_call.error_message.clone(),
                });

                execution_results.push(result);
            }

            if cancel.is_cancelled() {
                yield cancelled_event();
                yield StreamEvent::Done;
                return;
            }

            yield StreamEvent::Status(StatusPayload { stage: Stage::Verifying });

            let report = match verifier::verify_or_throw(&execution_results) {
                Ok(report) => report,
                Err(e) => {
                    yield StreamEvent::Verification(crate::domain::VerifierReport {
                        approved: false,
                        checks: Vec::new(),
                        summary: Some("every attempted tool execution failed".to_string()),
                        suggested_actions: Vec::new(),
                    });
                    yield error_event(&e, "verifying");
                    yield StreamEvent::Done;
                    return;
                }
            };

            yield StreamEvent::Verification(report.clone());

            if cancel.is_cancelled() {
                yield cancelled_event();
                yield StreamEvent::Done;
                return;
            }

            yield StreamEvent::Status(StatusPayload { stage: Stage::Answering });

            let tool_results: Vec<ToolResult> = execution_results
                .iter()
                .filter_map(|r| r.tool_result.clone())
                .collect();

            let mut fragments = self.llm.stream_answer(&ctx.user_message, &tool_results, &report, &system_context);
            use futures::StreamExt;
            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(token) => yield StreamEvent::Token(crate::stream_event::TokenPayload { token }),
                    Err(e) => {
                        yield error_event(&e, "answering");
                        yield StreamEvent::Done;
                        return;
                    }
                }
            }

            let answer = match answer_generator::generate(
                self.llm.as_ref(),
                &ctx.user_message,
                &tool_results,
                &report,
                &system_context,
            )
            .await
            {
                Ok(answer) => answer,
                Err(e) => {
                    yield error_event(&e, "answering");
                    yield StreamEvent::Done;
                    return;
                }
            };

            if let Err(e) = self
                .evidence_store
                .insert_message(&ctx.thread_id.to_string(), &ctx.message_id, "assistant", &answer.content)
                .await
            {
                tracing::warn!(error = %e, "failed to persist assistant message");
            }

            yield StreamEvent::Answer(answer);
            yield StreamEvent::Done;
        }
    }
}

fn error_event(e: &Error, stage: &str) -> StreamEvent {
    StreamEvent::Error(ErrorPayload {
        message: e.to_string(),
        stage: Some(stage.to_string()),
    })
}

fn cancelled_event() -> StreamEvent {
    StreamEvent::Error(ErrorPayload {
        message: "run cancelled".to_string(),
        stage: None,
    })
}
