//! StreamEvent: the tagged union emitted by the Pipeline Coordinator,
//! matching the SSE wire format's ten tags (spec §6).

use serde::{Deserialize, Serialize};

use crate::domain::{Answer, Plan, VerifierReport};

/// `status` payload's stage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Planning,
    Policy,
    ToolsRunning,
    Verifying,
    Answering,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPayload {
    pub thread_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallStartPayload {
    pub tool: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEndPayload {
    pub tool: String,
    pub status: crate::domain::ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// The tagged union emitted on the stream, one variant per SSE tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Meta(MetaPayload),
    Status(StatusPayload),
    Plan(Plan),
    ToolCallStart(ToolCallStartPayload),
    ToolCallEnd(ToolCallEndPayload),
    Verification(VerifierReport),
    Token(TokenPayload),
    Answer(Answer),
    Error(ErrorPayload),
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_and_data_fields() {
        let event = StreamEvent::Status(StatusPayload { stage: Stage::Planning });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status");
        assert_eq!(json["data"]["stage"], "planning");
    }

    #[test]
    fn done_serializes_without_a_data_field() {
        let event = StreamEvent::Done;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "done");
    }
}
