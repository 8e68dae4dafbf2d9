//! Tool Gate (C3): whole-plan checks run before any per-action policy —
//! action-count ceiling and tool-name allowlist (spec §4.3).

use crate::domain::Plan;

/// Evaluate the whole-plan checks. An empty allowlist is permissive.
pub fn evaluate(plan: &Plan, allowed_tools: &[String], max_tool_calls_per_plan: usize) -> Result<(), String> {
    if plan.actions.len() > max_tool_calls_per_plan {
        return Err(format!(
            "plan has {} actions, exceeding the cap of {max_tool_calls_per_plan}",
            plan.actions.len()
        ));
    }

    if allowed_tools.is_empty() {
        return Ok(());
    }

    let unknown: Vec<&str> = plan
        .actions
        .iter()
        .map(|a| a.tool.as_str())
        .filter(|tool| !allowed_tools.iter().any(|allowed| allowed == tool))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(format!("tool(s) not in the allowlist: {}", unknown.join(", ")))
    }
}
