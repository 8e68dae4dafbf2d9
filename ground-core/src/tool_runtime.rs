//! Tool Runtime (C6): dispatches approved actions to connectors in strict
//! plan order, with a per-call timeout, checksum computation, and an audit
//! trail that survives individual tool failures (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::connectors::{RagConnector, SqlConnector};
use crate::context::RunContext;
use crate::domain::{PlanAction, ToolCall, ToolExecutionResult, ToolResult};
use crate::error::Result;
use crate::validate::{validate_tool_call, validate_tool_result};

/// Uniform dispatch surface every registered tool implements, so the
/// runtime can hold one `HashMap<String, Arc<dyn ToolConnector>>`
/// regardless of each tool's own argument shape.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn call(&self, args: &Map<String, Value>, max_rows: u32) -> Result<(Vec<Value>, i64)>;
}

pub struct SqlToolConnector(pub Arc<dyn SqlConnector>);

#[async_trait]
impl ToolConnector for SqlToolConnector {
    async fn call(&self, args: &Map<String, Value>, max_rows: u32) -> Result<(Vec<Value>, i64)> {
        let sql = args
            .get("sql")
            .and_then(Value::as_str)
            .ok_or_else(|| crate::error::Error::tool_execution("sql.query", "missing 'sql' argument"))?;
        self.0.query(sql, max_rows).await
    }
}

pub struct RagToolConnector(pub Arc<dyn RagConnector>);

#[async_trait]
impl ToolConnector for RagToolConnector {
    async fn call(&self, args: &Map<String, Value>, max_rows: u32) -> Result<(Vec<Value>, i64)> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| crate::error::Error::tool_execution("rag.search", "missing 'query' argument"))?;
        let source_ids: Vec<String> = args
            .get("sourceIds")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        self.0.search(query, &source_ids, max_rows).await
    }
}

/// Dispatches approved tool actions, one at a time, in plan order.
pub struct ToolRuntime {
    connectors: HashMap<String, Arc<dyn ToolConnector>>,
}

impl ToolRuntime {
    pub fn new() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }

    pub fn register(mut self, tool_name: impl Into<String>, connector: Arc<dyn ToolConnector>) -> Self {
        self.connectors.insert(tool_name.into(), connector);
        self
    }

    /// Execute every approved action in order. Never returns `Err` for a
    /// single action's failure; each becomes an `error`-status `ToolCall`
    /// with no `ToolResult`, per spec §4.6 step 4.
    pub async fn execute_actions(
        &self,
        approved_actions: &[(PlanAction, Map<String, Value>)],
        ctx: &RunContext,
        per_tool_timeout: Duration,
        max_rows: u32,
    ) -> Vec<ToolExecutionResult> {
        let mut results = Vec::with_capacity(approved_actions.len());

        for (action, sanitized_args) in approved_actions {
            let mut call = ToolCall::start(
                ctx.message_id.to_string(),
                ctx.thread_id,
                ctx.workspace_id,
                action.tool.clone(),
                sanitized_args.clone(),
            );

            let outcome = self.dispatch_one(&action.tool, sanitized_args, per_tool_timeout, max_rows).await;

            let tool_result = match outcome {
                Ok((rows, row_count)) => {
                    call.finish_success();
                    let data = Value::Array(rows.clone());
                    let result = ToolResult::new(call.id, ctx.thread_id, ctx.workspace_id, data)
                        .with_row_count(row_count)
                        .with_preview_rows(rows);

                    match validate_tool_result(&result) {
                        Ok(()) => Some(result),
                        Err(issues) => {
                            let message = issues_to_message(&issues);
                            tracing::error!(tool = %action.tool, issues = %message, "tool runtime produced an invalid ToolResult");
                            call.finish_error(format!("internal error: invalid tool result ({message})"));
                            None
                        }
                    }
                }
                Err(message) => {
                    call.finish_error(message);
                    None
                }
            };

            if let Err(issues) = validate_tool_call(&call) {
                tracing::error!(
                    tool = %action.tool,
                    issues = %issues_to_message(&issues),
                    "tool runtime produced an invalid ToolCall"
                );
            }

            results.push(ToolExecutionResult {
                tool_call: call,
                tool_result,
            });
        }

        results
    }

    async fn dispatch_one(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
        timeout: Duration,
        max_rows: u32,
    ) -> std::result::Result<(Vec<Value>, i64), String> {
        let connector = match self.connectors.get(tool_name) {
            Some(c) => c,
            None => return Err(format!("no connector registered for tool '{tool_name}'")),
        };

        match tokio::time::timeout(timeout, connector.call(args, max_rows)).await {
            Ok(Ok((rows, count))) => {
                let truncated = rows.into_iter().take(max_rows as usize).collect::<Vec<_>>();
                Ok((truncated, count.min(max_rows as i64)))
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = tool_name, error = %e, "tool call failed");
                Err(e.to_string())
            }
            Err(_) => {
                tracing::warn!(tool = tool_name, timeout_ms = timeout.as_millis() as u64, "tool call timed out");
                Err(format!("tool call timed out after {}ms", timeout.as_millis()))
            }
        }
    }
}

impl Default for ToolRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn issues_to_message(issues: &[crate::validate::ValidationIssue]) -> String {
    issues.iter().map(|i| i.message.clone()).collect::<Vec<_>>().join("; ")
}
