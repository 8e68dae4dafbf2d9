//! Schema validators (spec §4.1, C1): the only boundary through which
//! LLM-produced JSON enters the typed domain, plus shape checks for the
//! entities the core constructs itself.

mod answer;
mod entities;
mod issue;
mod plan;

pub use answer::validate_answer;
pub use entities::{validate_tool_call, validate_tool_result, validate_verifier_report};
pub use issue::{IssueKind, ValidationIssue};
pub use plan::validate_plan;
