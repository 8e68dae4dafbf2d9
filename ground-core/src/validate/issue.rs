//! ValidationIssue: a single, user-presentable validation failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of validation failure, mirroring the shapes JSON Schema validation
/// commonly reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    MissingField,
    TypeMismatch { expected: String, got: String },
    EnumInvalid { allowed: Vec<String> },
    ConstraintViolated { constraint: String },
}

/// One validation failure, anchored to a field path (e.g. `"actions[0].tool"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn missing_field(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("missing required field '{path}'"),
            path,
            kind: IssueKind::MissingField,
        }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &str, value: &Value) -> Self {
        let path = path.into();
        let got = json_type_name(value);
        Self {
            message: format!("field '{path}' expected {expected}, got {got}"),
            path,
            kind: IssueKind::TypeMismatch {
                expected: expected.to_string(),
                got: got.to_string(),
            },
        }
    }

    pub fn enum_invalid(path: impl Into<String>, allowed: Vec<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("field '{path}' must be one of {allowed:?}"),
            path,
            kind: IssueKind::EnumInvalid { allowed },
        }
    }

    pub fn constraint(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        let path = path.into();
        let constraint = constraint.into();
        Self {
            message: format!("field '{path}' violates constraint: {constraint}"),
            path,
            kind: IssueKind::ConstraintViolated { constraint },
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
