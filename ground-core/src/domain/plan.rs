//! Plan and PlanAction: the planner's structured output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One planned tool invocation: a tool name plus arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    /// Non-empty tool name, e.g. `"sql.query"`.
    pub tool: String,
    /// Arguments passed to the tool, keyed by parameter name.
    pub args: Map<String, Value>,
    /// Why the planner chose this action, for audit/debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PlanAction {
    pub fn new(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            args,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Optional constraints the planner attaches to a plan, narrowing what the
/// Policy Engine and connectors are allowed to touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tables: Vec<String>,
}

/// The planner's structured output: a summary of intent plus the ordered
/// tool actions required to fulfil it, or a request for clarification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Non-empty summary of the plan's intent.
    pub intent: String,
    /// Ordered actions to execute. Empty iff `needs_clarification`.
    #[serde(default)]
    pub actions: Vec<PlanAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PlanConstraints>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
}

impl Plan {
    /// Check the invariant from spec §3:
    /// `(needsClarification ∧ actions = ∅) ∨ (¬needsClarification ∧ |actions| ≥ 1)`.
    pub fn is_well_formed(&self) -> bool {
        if self.needs_clarification {
            self.actions.is_empty() && self.clarification_question.is_some()
        } else {
            !self.actions.is_empty()
        }
    }

    pub fn clarification(intent: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            actions: Vec::new(),
            constraints: None,
            needs_clarification: true,
            clarification_question: Some(question.into()),
        }
    }
}
