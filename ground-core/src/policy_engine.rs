//! Policy Engine (C4): runs the Tool Gate as a whole-plan check, then
//! evaluates each action individually, delegating `sql.query` actions to
//! the SQL Safety Gate (spec §4.4).

use serde_json::{Map, Value};

use crate::config::PipelineConfig;
use crate::domain::{Plan, PolicyDecision};
use crate::error::{Error, Result};
use crate::sql_gate::{self, SqlPolicyConfig};
use crate::tool_gate;

/// Outcome of evaluating an entire plan.
pub struct PolicyOutcome {
    pub decisions: Vec<PolicyDecision>,
}

impl PolicyOutcome {
    /// The plan is executable iff at least one decision is approved
    /// (spec §4.4).
    pub fn is_executable(&self) -> bool {
        self.decisions.iter().any(|d| d.approved)
    }
}

/// Evaluate a plan against policy. Returns `Err(Error::PolicyBlocked)` if
/// the Tool Gate rejects the whole plan; otherwise one `PolicyDecision` per
/// action.
pub fn evaluate(plan: &Plan, config: &PipelineConfig) -> Result<PolicyOutcome> {
    tool_gate::evaluate(plan, &config.allowed_tools, config.max_tool_calls_per_plan)
        .map_err(Error::policy_blocked)?;

    let sql_config = SqlPolicyConfig {
        max_rows: config.max_rows,
        allowed_tables: config.allowed_tables.clone(),
        allowed_columns: Vec::new(),
        forbidden_functions: config.forbidden_functions.clone(),
    };

    let mut decisions = Vec::with_capacity(plan.actions.len());
    for action in &plan.actions {
        let decision = if action.tool == "sql.query" {
            evaluate_sql_action(action, &sql_config)?
        } else {
            PolicyDecision::approve(action.clone(), action.args.clone())
        };
        decisions.push(decision);
    }

    Ok(PolicyOutcome { decisions })
}

fn evaluate_sql_action(
    action: &crate::domain::PlanAction,
    sql_config: &SqlPolicyConfig,
) -> Result<PolicyDecision> {
    let sql = match action.args.get("sql").and_then(Value::as_str) {
        Some(s) => s,
        None => {
            return Ok(PolicyDecision::reject(
                action.clone(),
                vec!["missing required 'sql' argument".to_string()],
            ));
        }
    };

    let gate_result = match sql_gate::evaluate(sql, sql_config) {
        Ok(result) => result,
        Err(e) => return Ok(PolicyDecision::reject(action.clone(), vec![e.to_string()])),
    };

    if !gate_result.valid {
        return Ok(PolicyDecision::reject(action.clone(), gate_result.errors));
    }

    let mut sanitized_args: Map<String, Value> = action.args.clone();
    sanitized_args.insert("sql".to_string(), Value::String(gate_result.sanitized_sql));
    sanitized_args.insert(
        "effectiveLimit".to_string(),
        Value::Number(gate_result.effective_limit.into()),
    );

    Ok(PolicyDecision::approve(action.clone(), sanitized_args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlanAction;
    use serde_json::json;

    fn sql_action(sql: &str) -> PlanAction {
        let mut args = Map::new();
        args.insert("sql".to_string(), json!(sql));
        PlanAction::new("sql.query", args)
    }

    #[test]
    fn approves_safe_sql_action() {
        let plan = Plan {
            intent: "count rows".into(),
            actions: vec![sql_action("SELECT * FROM workspaces")],
            constraints: None,
            needs_clarification: false,
            clarification_question: None,
        };
        let config = PipelineConfig::default();
        let outcome = evaluate(&plan, &config).unwrap();
        assert!(outcome.is_executable());
        assert!(outcome.decisions[0].approved);
    }

    #[test]
    fn rejects_action_missing_sql_argument() {
        let plan = Plan {
            intent: "broken".into(),
            actions: vec![PlanAction::new("sql.query", Map::new())],
            constraints: None,
            needs_clarification: false,
            clarification_question: None,
        };
        let config = PipelineConfig::default();
        let outcome = evaluate(&plan, &config).unwrap();
        assert!(!outcome.decisions[0].approved);
    }

    #[test]
    fn blocks_whole_plan_when_tool_not_allowed() {
        let plan = Plan {
            intent: "do something illegal".into(),
            actions: vec![PlanAction::new("shell.exec", Map::new())],
            constraints: None,
            needs_clarification: false,
            clarification_question: None,
        };
        let config = PipelineConfig::default();
        let err = evaluate(&plan, &config).unwrap_err();
        assert_eq!(err.code(), "POLICY_BLOCKED");
    }
}
