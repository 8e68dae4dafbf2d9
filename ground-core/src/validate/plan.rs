//! Plan schema validation: the sole gate between LLM-produced JSON and the
//! rest of the core (spec §4.1).

use serde_json::Value;

use crate::domain::{Plan, PlanAction, PlanConstraints};

use super::issue::ValidationIssue;

const MAX_TOOL_NAME_CHARS: usize = 128;

/// Validate a raw JSON value as a `Plan`, per spec §3's shape and invariant.
pub fn validate_plan(raw: &Value) -> Result<Plan, Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            return Err(vec![ValidationIssue::type_mismatch("", "object", raw)]);
        }
    };

    let intent = match obj.get("intent").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        Some(_) => {
            issues.push(ValidationIssue::constraint("intent", "must be non-empty"));
            String::new()
        }
        None => {
            issues.push(ValidationIssue::missing_field("intent"));
            String::new()
        }
    };

    let needs_clarification = obj
        .get("needsClarification")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let clarification_question = obj
        .get("clarificationQuestion")
        .and_then(Value::as_str)
        .map(str::to_string);

    if needs_clarification && clarification_question.is_none() {
        issues.push(ValidationIssue::constraint(
            "clarificationQuestion",
            "required when needsClarification is true",
        ));
    }

    let actions = match obj.get("actions") {
        Some(Value::Array(items)) => {
            let mut parsed = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match validate_plan_action(item, i) {
                    Ok(action) => parsed.push(action),
                    Err(mut action_issues) => issues.append(&mut action_issues),
                }
            }
            parsed
        }
        Some(other) => {
            issues.push(ValidationIssue::type_mismatch("actions", "array", other));
            Vec::new()
        }
        None => Vec::new(),
    };

    if !needs_clarification && actions.is_empty() {
        issues.push(ValidationIssue::constraint(
            "actions",
            "must have length >= 1 unless needsClarification is true",
        ));
    }

    if needs_clarification && !actions.is_empty() {
        issues.push(ValidationIssue::constraint(
            "actions",
            "must be empty when needsClarification is true",
        ));
    }

    let constraints = match obj.get("constraints") {
        Some(Value::Object(c)) => Some(PlanConstraints {
            max_rows: c.get("maxRows").and_then(Value::as_u64).map(|n| n as u32),
            source_ids: c
                .get("sourceIds")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            allowed_tables: c
                .get("allowedTables")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default(),
        }),
        Some(other) => {
            issues.push(ValidationIssue::type_mismatch("constraints", "object", other));
            None
        }
        None => None,
    };

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(Plan {
        intent,
        actions,
        constraints,
        needs_clarification,
        clarification_question,
    })
}

fn validate_plan_action(raw: &Value, index: usize) -> Result<PlanAction, Vec<ValidationIssue>> {
    let path_tool = format!("actions[{index}].tool");
    let path_args = format!("actions[{index}].args");
    let mut issues = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => return Err(vec![ValidationIssue::type_mismatch(format!("actions[{index}]"), "object", raw)]),
    };

    let tool = match obj.get("tool").and_then(Value::as_str) {
        Some(s) if !s.is_empty() && s.len() <= MAX_TOOL_NAME_CHARS => s.to_string(),
        Some(_) => {
            issues.push(ValidationIssue::constraint(
                &path_tool,
                format!("must be non-empty and <= {MAX_TOOL_NAME_CHARS} chars"),
            ));
            String::new()
        }
        None => {
            issues.push(ValidationIssue::missing_field(&path_tool));
            String::new()
        }
    };

    let args = match obj.get("args") {
        Some(Value::Object(m)) => m.clone(),
        Some(other) => {
            issues.push(ValidationIssue::type_mismatch(&path_args, "object", other));
            serde_json::Map::new()
        }
        None => {
            issues.push(ValidationIssue::missing_field(&path_args));
            serde_json::Map::new()
        }
    };

    let reason = obj.get("reason").and_then(Value::as_str).map(String::from);

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(PlanAction { tool, args, reason })
}
