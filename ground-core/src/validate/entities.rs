//! Structural invariant checks for entities produced internally (not from
//! untrusted LLM JSON): `ToolCall`, `ToolResult`, `VerifierReport`. These
//! still route through a validator per spec §4.1 — "Enforce shape of
//! Plan, ToolCall, ToolResult, VerifierReport, Answer" — even though their
//! shape is guaranteed by construction, so that a future producer (e.g. a
//! new connector) can't silently violate the numeric/ID invariants.

use crate::domain::{ToolCall, ToolCallStatus, ToolResult, VerifierReport};

use super::issue::ValidationIssue;

pub fn validate_tool_call(call: &ToolCall) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if call.tool_name.is_empty() || call.tool_name.len() > 128 {
        issues.push(ValidationIssue::constraint(
            "tool_name",
            "must be non-empty and <= 128 chars",
        ));
    }

    if let Some(duration) = call.duration_ms {
        if duration < 0 {
            issues.push(ValidationIssue::constraint("duration_ms", "must be >= 0"));
        }
    }

    if matches!(call.status, ToolCallStatus::Success | ToolCallStatus::Error) && call.finished_at.is_none() {
        issues.push(ValidationIssue::constraint(
            "finished_at",
            "required once status is success or error",
        ));
    }

    if call.status == ToolCallStatus::Error && call.error_message.is_none() {
        issues.push(ValidationIssue::constraint("error_message", "required when status is error"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

pub fn validate_tool_result(result: &ToolResult) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if let Some(row_count) = result.row_count {
        if row_count < 0 {
            issues.push(ValidationIssue::constraint("row_count", "must be >= 0"));
        }
    }

    if let Some(checksum) = &result.checksum {
        if checksum.len() != 16 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
            issues.push(ValidationIssue::constraint(
                "checksum",
                "must be a 16-hex-character string",
            ));
        }
    }

    if result.preview_rows.len() > 10 {
        issues.push(ValidationIssue::constraint("preview_rows", "must contain at most 10 rows"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

pub fn validate_verifier_report(report: &VerifierReport) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if !report.approved && report.summary.is_none() {
        issues.push(ValidationIssue::constraint(
            "summary",
            "required when approved is false",
        ));
    }

    for (i, check) in report.checks.iter().enumerate() {
        if check.supported && check.evidence_id.is_none() {
            issues.push(ValidationIssue::constraint(
                format!("checks[{i}].evidence_id"),
                "required when supported is true",
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
