//! Verifier (C7): a pure structural grounding check over tool execution
//! results. No claim-text parsing — grounding is a count of usable
//! evidence items, not a linguistic match against the eventual answer
//! (spec §4.7, restated in §9).

use serde_json::Value;

use crate::domain::{EvidenceCheck, EvidenceType, ToolExecutionResult, VerifierReport};
use crate::error::{Error, Result};

/// Build the structural report for a batch of tool execution results.
pub fn verify(results: &[ToolExecutionResult]) -> VerifierReport {
    let coverage_supported = results
        .iter()
        .any(|r| r.tool_call.status == crate::domain::ToolCallStatus::Success && r.tool_result.is_some());

    let mut checks = vec![coverage_check(coverage_supported)];

    for result in results {
        let tool_name = &result.tool_call.tool_name;
        match &result.tool_result {
            Some(tool_result) if result.tool_call.status == crate::domain::ToolCallStatus::Success => {
                checks.push(result_check(tool_name, tool_result));
            }
            _ => {
                let reason = result
                    .tool_call
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "tool execution did not succeed".to_string());
                checks.push(EvidenceCheck::unsupported(
                    format!("tool '{tool_name}' executed successfully"),
                    reason,
                ));
            }
        }
    }

    let approved = checks.iter().all(|c| c.evidence_type.is_none() || c.supported) && coverage_supported;

    let summary = if approved {
        None
    } else {
        Some("insufficient grounded evidence to answer confidently".to_string())
    };

    let suggested_actions = checks
        .iter()
        .filter(|c| !c.supported)
        .map(|c| format!("retry or rephrase: {}", c.claim))
        .collect();

    VerifierReport {
        approved,
        checks,
        summary,
        suggested_actions,
    }
}

fn coverage_check(supported: bool) -> EvidenceCheck {
    if supported {
        EvidenceCheck {
            claim: "at least one tool execution succeeded".to_string(),
            supported: true,
            evidence_id: None,
            evidence_type: None,
            reason: None,
        }
    } else {
        EvidenceCheck::unsupported(
            "at least one tool execution succeeded",
            "no tool execution returned usable data",
        )
    }
}

fn result_check(tool_name: &str, tool_result: &crate::domain::ToolResult) -> EvidenceCheck {
    let has_rows = tool_result.row_count.map(|n| n > 0).unwrap_or(false);
    let has_nonempty_object = matches!(&tool_result.data, Value::Object(o) if !o.is_empty());

    let claim = format!("tool '{tool_name}' returned data");
    if has_rows || has_nonempty_object {
        EvidenceCheck::supported(claim, tool_result.id.to_string(), EvidenceType::ToolResult)
    } else {
        EvidenceCheck::unsupported(claim, "tool returned zero rows and no object data")
    }
}

/// Fatal shortcut: raises iff every attempted tool execution failed and at
/// least one was attempted (spec §4.7).
pub fn verify_or_throw(results: &[ToolExecutionResult]) -> Result<VerifierReport> {
    let attempted = results.len();
    let all_failed = attempted > 0
        && results
            .iter()
            .all(|r| r.tool_call.status != crate::domain::ToolCallStatus::Success || r.tool_result.is_none());

    if all_failed {
        return Err(Error::verification(attempted));
    }

    Ok(verify(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ThreadId, ToolCall, ToolResult, WorkspaceId};
    use serde_json::{json, Map};

    fn successful_result(data: Value, row_count: Option<i64>) -> ToolExecutionResult {
        let thread_id = ThreadId::new();
        let workspace_id = WorkspaceId::new();
        let mut call = ToolCall::start("m1", thread_id, workspace_id, "sql.query", Map::new());
        call.finish_success();
        let mut result = ToolResult::new(call.id, thread_id, workspace_id, data);
        if let Some(n) = row_count {
            result = result.with_row_count(n);
        }
        ToolExecutionResult {
            tool_call: call,
            tool_result: Some(result),
        }
    }

    fn failed_result() -> ToolExecutionResult {
        let thread_id = ThreadId::new();
        let workspace_id = WorkspaceId::new();
        let mut call = ToolCall::start("m1", thread_id, workspace_id, "sql.query", Map::new());
        call.finish_error("connection refused");
        ToolExecutionResult {
            tool_call: call,
            tool_result: None,
        }
    }

    #[test]
    fn approves_when_result_has_rows() {
        let results = vec![successful_result(json!([{"id": 1}]), Some(1))];
        let report = verify(&results);
        assert!(report.approved);
        assert!(report.summary.is_none());
    }

    #[test]
    fn empty_result_is_still_approved_but_flagged() {
        // Coverage only requires a successful execution with a toolResult
        // present; an empty result is unsupported evidence on its own
        // check but does not by itself flip the report's `approved` flag.
        let results = vec![successful_result(json!([]), Some(0))];
        let report = verify(&results);
        assert!(report.approved);
        assert!(report.checks.iter().any(|c| !c.supported));
        assert!(!report.suggested_actions.is_empty());
    }

    #[test]
    fn rejects_when_no_execution_succeeded() {
        let results = vec![failed_result()];
        let report = verify(&results);
        assert!(!report.approved);
        assert!(report.summary.is_some());
    }

    #[test]
    fn verify_or_throw_raises_when_all_failed() {
        let results = vec![failed_result(), failed_result()];
        let err = verify_or_throw(&results).unwrap_err();
        assert_eq!(err.code(), "VERIFICATION_ERROR");
    }

    #[test]
    fn verify_or_throw_tolerates_mixed_outcomes() {
        let results = vec![failed_result(), successful_result(json!([{"id": 1}]), Some(1))];
        let report = verify_or_throw(&results).unwrap();
        assert!(report.approved);
    }
}
