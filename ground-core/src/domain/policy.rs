//! PolicyDecision: the approval verdict for one planned action.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::plan::PlanAction;

/// The approval verdict for one `PlanAction`, plus the sanitized arguments
/// actually dispatched if approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub action: PlanAction,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitized_args: Option<Map<String, Value>>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PolicyDecision {
    pub fn approve(action: PlanAction, sanitized_args: Map<String, Value>) -> Self {
        Self {
            action,
            approved: true,
            sanitized_args: Some(sanitized_args),
            errors: Vec::new(),
        }
    }

    pub fn reject(action: PlanAction, errors: Vec<String>) -> Self {
        Self {
            action,
            approved: false,
            sanitized_args: None,
            errors,
        }
    }

    /// Invariant from spec §3: approved decisions always carry sanitized args.
    pub fn is_well_formed(&self) -> bool {
        self.approved == self.sanitized_args.is_some()
    }
}
