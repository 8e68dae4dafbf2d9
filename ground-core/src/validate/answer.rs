//! Answer schema validation, plus the citation subset-invariant from
//! spec §3/§4.8 (enforced by the caller with the run's known evidence ids —
//! see `answer_generator`).

use serde_json::Value;

use crate::domain::{Answer, Citation, EvidenceType};

use super::issue::ValidationIssue;

pub fn validate_answer(raw: &Value) -> Result<Answer, Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let obj = match raw.as_object() {
        Some(o) => o,
        None => return Err(vec![ValidationIssue::type_mismatch("", "object", raw)]),
    };

    let content = match obj.get("content").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        Some(_) => {
            issues.push(ValidationIssue::constraint("content", "must be non-empty"));
            String::new()
        }
        None => {
            issues.push(ValidationIssue::missing_field("content"));
            String::new()
        }
    };

    let citations = match obj.get("citations") {
        Some(Value::Array(items)) => {
            let mut parsed = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match validate_citation(item, i) {
                    Ok(c) => parsed.push(c),
                    Err(mut sub) => issues.append(&mut sub),
                }
            }
            parsed
        }
        Some(other) => {
            issues.push(ValidationIssue::type_mismatch("citations", "array", other));
            Vec::new()
        }
        None => Vec::new(),
    };

    let follow_ups = obj
        .get("followUps")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(Answer {
        content,
        citations,
        follow_ups,
    })
}

fn validate_citation(raw: &Value, index: usize) -> Result<Citation, Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let obj = match raw.as_object() {
        Some(o) => o,
        None => return Err(vec![ValidationIssue::type_mismatch(format!("citations[{index}]"), "object", raw)]),
    };

    let idx_path = format!("citations[{index}].index");
    let index_val = match obj.get("index").and_then(Value::as_u64) {
        Some(n) if n >= 1 => n as u32,
        Some(_) => {
            issues.push(ValidationIssue::constraint(&idx_path, "must be >= 1"));
            0
        }
        None => {
            issues.push(ValidationIssue::missing_field(&idx_path));
            0
        }
    };

    let id_path = format!("citations[{index}].evidenceId");
    let evidence_id = match obj.get("evidenceId").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            issues.push(ValidationIssue::missing_field(&id_path));
            String::new()
        }
    };

    let type_path = format!("citations[{index}].evidenceType");
    let evidence_type = match obj.get("evidenceType").and_then(Value::as_str) {
        Some("tool_result") => EvidenceType::ToolResult,
        Some("chunk") => EvidenceType::Chunk,
        Some(_) => {
            issues.push(ValidationIssue::enum_invalid(
                &type_path,
                vec!["tool_result".into(), "chunk".into()],
            ));
            EvidenceType::ToolResult
        }
        None => {
            issues.push(ValidationIssue::missing_field(&type_path));
            EvidenceType::ToolResult
        }
    };

    let label = obj.get("label").and_then(Value::as_str).map(String::from);

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(Citation {
        index: index_val,
        evidence_id,
        evidence_type,
        label,
    })
}
