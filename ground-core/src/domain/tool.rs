//! ToolCall and ToolResult: the audit trail of one tool dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{ThreadId, ToolCallId, ToolResultId, WorkspaceId};

/// Lifecycle status of a `ToolCall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Success,
    Error,
    /// Produced by the Policy Engine for rejected actions; never dispatched.
    Blocked,
}

/// Audit record of one tool dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub message_id: String,
    pub thread_id: ThreadId,
    pub workspace_id: WorkspaceId,
    pub tool_name: String,
    pub tool_args: Map<String, Value>,
    pub status: ToolCallStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolCall {
    /// Start a new tool call in the `running` state.
    pub fn start(
        message_id: impl Into<String>,
        thread_id: ThreadId,
        workspace_id: WorkspaceId,
        tool_name: impl Into<String>,
        tool_args: Map<String, Value>,
    ) -> Self {
        Self {
            id: ToolCallId::new(),
            message_id: message_id.into(),
            thread_id,
            workspace_id,
            tool_name: tool_name.into(),
            tool_args,
            status: ToolCallStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            error_message: None,
        }
    }

    pub fn finish_success(&mut self) {
        let finished_at = Utc::now();
        self.duration_ms = Some((finished_at - self.started_at).num_milliseconds().max(0));
        self.finished_at = Some(finished_at);
        self.status = ToolCallStatus::Success;
    }

    pub fn finish_error(&mut self, message: impl Into<String>) {
        let finished_at = Utc::now();
        self.duration_ms = Some((finished_at - self.started_at).num_milliseconds().max(0));
        self.finished_at = Some(finished_at);
        self.status = ToolCallStatus::Error;
        self.error_message = Some(message.into());
    }
}

/// Structured output of a successful tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: ToolResultId,
    pub tool_call_id: ToolCallId,
    pub thread_id: ThreadId,
    pub workspace_id: WorkspaceId,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview_rows: Vec<Value>,
}

impl ToolResult {
    /// 16-hex-character prefix of the SHA-256 over a canonical JSON
    /// serialization of `data`, per spec §3.
    pub fn checksum_of(data: &Value) -> String {
        use sha2::{Digest, Sha256};
        let canonical = serde_json::to_vec(data).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        hex[..16].to_string()
    }

    pub fn new(tool_call_id: ToolCallId, thread_id: ThreadId, workspace_id: WorkspaceId, data: Value) -> Self {
        let checksum = Self::checksum_of(&data);
        Self {
            id: ToolResultId::new(),
            tool_call_id,
            thread_id,
            workspace_id,
            data,
            row_count: None,
            checksum: Some(checksum),
            preview_rows: Vec::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: i64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_preview_rows(mut self, rows: Vec<Value>) -> Self {
        self.preview_rows = rows.into_iter().take(10).collect();
        self
    }
}

/// Pairing of a dispatched `ToolCall` with its `ToolResult`, if any.
///
/// `tool_result` is `None` iff `tool_call.status != Success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub tool_call: ToolCall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let data = serde_json::json!({"a": 1, "b": [1, 2, 3]});
        let c1 = ToolResult::checksum_of(&data);
        let c2 = ToolResult::checksum_of(&data);
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 16);
    }

    #[test]
    fn checksum_differs_for_different_data() {
        let a = serde_json::json!({"a": 1});
        let b = serde_json::json!({"a": 2});
        assert_ne!(ToolResult::checksum_of(&a), ToolResult::checksum_of(&b));
    }
}
