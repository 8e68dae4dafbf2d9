//! End-to-end scenarios exercising the whole Pipeline Coordinator through
//! its public surface: a scripted `LlmAdapter`, a real (in-memory) SQL
//! connector, and the actual Policy Engine / Tool Runtime / Verifier /
//! Answer Generator stages.
//!
//! Integration tests compile against `ground_core` without `cfg(test)`,
//! so the crate's internal `MockLlmAdapter` isn't visible here; this file
//! scripts its own adapter against the public `LlmAdapter` trait instead.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use ground_core::connectors::SqliteSqlConnector;
use ground_core::domain::{ThreadId, ToolCallStatus, ToolResult, VerifierReport, WorkspaceId};
use ground_core::tool_runtime::SqlToolConnector;
use ground_core::{
    AnswerFragmentStream, CancellationFlag, Error, LlmAdapter, PipelineConfig, PipelineCoordinator, Result,
    RunContext, StreamEvent, ToolRuntime,
};

/// Scripted `LlmAdapter`: returns one canned plan (consumed once) and one
/// canned answer, mirroring the shape of a real provider without a network
/// call.
struct ScriptedLlmAdapter {
    plan: Mutex<Option<Value>>,
    answer: Value,
}

impl ScriptedLlmAdapter {
    fn new(plan: Value, answer: Value) -> Self {
        Self {
            plan: Mutex::new(Some(plan)),
            answer,
        }
    }
}

#[async_trait]
impl LlmAdapter for ScriptedLlmAdapter {
    async fn generate_plan(
        &self,
        _user_message: &str,
        _system_context: &str,
        _allowed_tools: &[String],
        _temperature: f64,
    ) -> Result<Value> {
        self.plan
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::LlmAdapter("scripted adapter has no more plans queued".to_string()))
    }

    async fn generate_answer(
        &self,
        _user_message: &str,
        _tool_results: &[ToolResult],
        _verifier_report: &VerifierReport,
        _system_context: &str,
    ) -> Result<Value> {
        Ok(self.answer.clone())
    }

    fn stream_answer(
        &self,
        _user_message: &str,
        _tool_results: &[ToolResult],
        _verifier_report: &VerifierReport,
        _system_context: &str,
    ) -> AnswerFragmentStream {
        let content = self.answer.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
        Box::pin(async_stream::stream! {
            yield Ok(content);
        })
    }
}

fn ctx(message: &str) -> RunContext {
    RunContext::new(WorkspaceId::new(), ThreadId::new(), "msg-1", message).with_allowed_sources(vec!["workspaces".to_string()])
}

fn seeded_connector() -> SqliteSqlConnector {
    let connector = SqliteSqlConnector::in_memory().unwrap();
    connector
        .execute_batch(
            "CREATE TABLE workspaces (id INTEGER, name TEXT);
             INSERT INTO workspaces VALUES (1, 'alpha'), (2, 'beta'), (3, 'gamma')",
        )
        .unwrap();
    connector
}

async fn run_with(
    llm: ScriptedLlmAdapter,
    runtime: ToolRuntime,
    config: PipelineConfig,
    message: &str,
) -> Vec<StreamEvent> {
    let coordinator = Arc::new(PipelineCoordinator::new(
        Arc::new(llm),
        Arc::new(runtime),
        Arc::new(ground_core::evidence_store::NullEvidenceStore),
        config,
    ));
    coordinator.run(ctx(message), CancellationFlag::new()).collect().await
}

/// Scenario 1: a single, well-formed `sql.query` action runs to completion
/// and produces a cited answer.
#[tokio::test]
async fn happy_path_single_sql_query() {
    let runtime = ToolRuntime::new().register("sql.query", Arc::new(SqlToolConnector(Arc::new(seeded_connector()))));
    let plan = json!({
        "intent": "count workspaces",
        "actions": [{"tool": "sql.query", "args": {"sql": "SELECT * FROM workspaces"}}],
    });
    let answer = json!({
        "content": "There are 3 workspaces. [1]",
        "citations": [],
    });

    let events = run_with(
        ScriptedLlmAdapter::new(plan, answer),
        runtime,
        PipelineConfig::default(),
        "how many workspaces are there?",
    )
    .await;

    assert!(matches!(events.first(), Some(StreamEvent::Meta(_))));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
    let tool_end = events.iter().find_map(|e| match e {
        StreamEvent::ToolCallEnd(p) => Some(p),
        _ => None,
    });
    assert_eq!(tool_end.unwrap().status, ToolCallStatus::Success);
    assert_eq!(tool_end.unwrap().row_count, Some(3));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Answer(_))));
}

/// Scenario 2: an unbounded query gets a LIMIT injected by the SQL Safety
/// Gate before it ever reaches the connector.
#[tokio::test]
async fn limit_injection_bounds_an_unbounded_query() {
    let connector = SqliteSqlConnector::in_memory().unwrap();
    connector
        .execute_batch(
            "CREATE TABLE workspaces (id INTEGER);
             INSERT INTO workspaces VALUES (1), (2), (3), (4), (5)",
        )
        .unwrap();
    let runtime = ToolRuntime::new().register("sql.query", Arc::new(SqlToolConnector(Arc::new(connector))));
    let plan = json!({
        "intent": "list all workspaces",
        "actions": [{"tool": "sql.query", "args": {"sql": "SELECT * FROM workspaces"}}],
    });
    let config = PipelineConfig {
        max_rows: 2,
        ..PipelineConfig::default()
    };

    let events = run_with(
        ScriptedLlmAdapter::new(plan, json!({"content": "Showing the first 2 workspaces. [1]", "citations": []})),
        runtime,
        config,
        "list every workspace",
    )
    .await;

    let tool_start = events.iter().find_map(|e| match e {
        StreamEvent::ToolCallStart(p) => Some(p),
        _ => None,
    });
    let sql_sent = tool_start.unwrap().args.get("sql").and_then(Value::as_str).unwrap();
    assert!(sql_sent.to_uppercase().contains("LIMIT 2"));

    let tool_end = events.iter().find_map(|e| match e {
        StreamEvent::ToolCallEnd(p) => Some(p),
        _ => None,
    });
    assert_eq!(tool_end.unwrap().row_count, Some(2));
}

/// Scenario 3: a plan whose only action is a forbidden statement is
/// rejected by the Policy Engine before any tool dispatch occurs.
#[tokio::test]
async fn blocked_statement_never_reaches_the_tool_runtime() {
    let runtime = ToolRuntime::new().register("sql.query", Arc::new(SqlToolConnector(Arc::new(seeded_connector()))));
    let plan = json!({
        "intent": "stall the database",
        "actions": [{"tool": "sql.query", "args": {"sql": "SELECT pg_sleep(10) FROM workspaces"}}],
    });

    let events = run_with(
        ScriptedLlmAdapter::new(plan, json!({})),
        runtime,
        PipelineConfig::default(),
        "run this for me",
    )
    .await;

    assert!(!events.iter().any(|e| matches!(e, StreamEvent::ToolCallStart(_))));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Error(_))));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}

/// Scenario 4: a two-action plan where one action fails still verifies and
/// answers off the surviving evidence, never aborting the whole run.
#[tokio::test]
async fn compound_plan_tolerates_one_failing_action() {
    let runtime = ToolRuntime::new().register("sql.query", Arc::new(SqlToolConnector(Arc::new(seeded_connector()))));
    let plan = json!({
        "intent": "look up workspaces and check an unsupported tool",
        "actions": [
            {"tool": "sql.query", "args": {"sql": "SELECT * FROM workspaces"}},
            {"tool": "rag.search", "args": {"query": "workspace policy", "sourceIds": []}},
        ],
    });

    let events = run_with(
        ScriptedLlmAdapter::new(plan, json!({"content": "Found 3 workspaces. [1]", "citations": []})),
        runtime,
        PipelineConfig::default(),
        "what do we know about our workspaces?",
    )
    .await;

    let ends: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::ToolCallEnd(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(ends.len(), 2);
    assert!(ends.iter().any(|p| p.status == ToolCallStatus::Success));
    assert!(ends.iter().any(|p| p.status == ToolCallStatus::Error));

    let verification = events.iter().find_map(|e| match e {
        StreamEvent::Verification(r) => Some(r),
        _ => None,
    });
    assert!(verification.unwrap().approved);
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Answer(_))));
}

/// Scenario 5: every tool call in the plan fails, so the Verifier raises
/// before the Answer Generator is ever invoked.
#[tokio::test]
async fn all_tools_failing_raises_a_verification_error() {
    // No connectors registered at all: both actions dispatch to an
    // unregistered tool name and come back as `error`-status calls.
    let runtime = ToolRuntime::new();
    let plan = json!({
        "intent": "look something up",
        "actions": [{"tool": "sql.query", "args": {"sql": "SELECT * FROM workspaces"}}],
    });

    let events = run_with(
        ScriptedLlmAdapter::new(plan, json!({"content": "unreachable", "citations": []})),
        runtime,
        PipelineConfig::default(),
        "look this up",
    )
    .await;

    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Answer(_))));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::Error(p) if p.message.contains("attempted tool executions failed"))));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}

/// Scenario 6: the planner asks for clarification instead of proposing
/// actions, short-circuiting straight to an answer carrying the question.
#[tokio::test]
async fn clarification_plan_skips_tools_and_verification() {
    let runtime = ToolRuntime::new();
    let plan = json!({
        "intent": "ambiguous workspace reference",
        "needsClarification": true,
        "clarificationQuestion": "Which workspace do you mean: alpha, beta, or gamma?",
    });

    let events = run_with(
        ScriptedLlmAdapter::new(plan, json!({})),
        runtime,
        PipelineConfig::default(),
        "tell me about the workspace",
    )
    .await;

    assert!(!events.iter().any(|e| matches!(e, StreamEvent::ToolCallStart(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Verification(_))));
    let answer = events.iter().find_map(|e| match e {
        StreamEvent::Answer(a) => Some(a),
        _ => None,
    });
    assert!(answer.unwrap().content.contains("Which workspace"));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}
