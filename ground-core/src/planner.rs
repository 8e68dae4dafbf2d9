//! Planner (C5): invokes the `LlmAdapter` for a `Plan`, validates it, and
//! retries with the validation issues fed back into the system context so
//! a real LLM can self-correct (spec §4.5).

use crate::domain::Plan;
use crate::error::{Error, Result};
use crate::llm::LlmAdapter;
use crate::validate::validate_plan;

/// Plan the next step for a user message, retrying validation failures up
/// to `max_retries` times.
pub async fn plan(
    adapter: &dyn LlmAdapter,
    user_message: &str,
    system_context: &str,
    allowed_tools: &[String],
    temperature: f64,
    max_retries: u32,
) -> Result<Plan> {
    let mut last_issues: Vec<String> = Vec::new();
    let mut context = system_context.to_string();

    for attempt in 0..=max_retries {
        let raw = adapter
            .generate_plan(user_message, &context, allowed_tools, temperature)
            .await?;

        match validate_plan(&raw) {
            Ok(plan) => return Ok(plan),
            Err(issues) => {
                last_issues = issues.iter().map(|i| i.message.clone()).collect();
                if attempt < max_retries {
                    context = format!(
                        "{system_context}\n\nYour previous plan was rejected for:\n- {}",
                        last_issues.join("\n- ")
                    );
                }
            }
        }
    }

    Err(Error::planner(max_retries, "plan failed schema validation", last_issues))
}
