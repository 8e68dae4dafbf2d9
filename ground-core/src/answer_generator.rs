//! Answer Generator (C8): invokes the `LlmAdapter`, validates the result
//! against the Answer schema, and enforces the citation subset-invariant
//! before anything reaches the stream (spec §4.8).

use std::collections::HashSet;

use crate::domain::{Answer, ToolResult, VerifierReport};
use crate::error::{Error, Result};
use crate::llm::LlmAdapter;
use crate::validate::validate_answer;

/// Generate and validate the final Answer for a run.
///
/// If `tool_results` is empty, an empty `citations` list is permitted and
/// the adapter is expected to express the absence of data; otherwise every
/// `Citation.evidenceId` MUST resolve to a known `ToolResult.id`.
pub async fn generate(
    adapter: &dyn LlmAdapter,
    user_message: &str,
    tool_results: &[ToolResult],
    verifier_report: &VerifierReport,
    system_context: &str,
) -> Result<Answer> {
    let raw = adapter
        .generate_answer(user_message, tool_results, verifier_report, system_context)
        .await?;

    let answer = validate_answer(&raw).map_err(|issues| {
        Error::Validation(format!(
            "answer failed schema validation: {}",
            issues.iter().map(|i| i.message.clone()).collect::<Vec<_>>().join("; ")
        ))
    })?;

    enforce_citation_subset_invariant(&answer, tool_results)?;

    Ok(answer)
}

fn enforce_citation_subset_invariant(answer: &Answer, tool_results: &[ToolResult]) -> Result<()> {
    if tool_results.is_empty() {
        return Ok(());
    }

    let known_ids: HashSet<String> = tool_results.iter().map(|tr| tr.id.to_string()).collect();
    let unknown: Vec<&str> = answer
        .citations
        .iter()
        .map(|c| c.evidence_id.as_str())
        .filter(|id| !known_ids.contains(*id))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "answer cites unknown evidence id(s): {}",
            unknown.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EvidenceType, ThreadId, WorkspaceId};
    use crate::llm::MockLlmAdapter;
    use serde_json::json;

    fn make_tool_result() -> ToolResult {
        ToolResult::new(
            crate::domain::ToolCallId::new(),
            ThreadId::new(),
            WorkspaceId::new(),
            json!([{"id": 1}]),
        )
    }

    #[tokio::test]
    async fn accepts_answer_citing_known_evidence() {
        let tool_result = make_tool_result();
        let answer_json = json!({
            "content": "There is 1 row [1].",
            "citations": [{"index": 1, "evidenceId": tool_result.id.to_string(), "evidenceType": "tool_result"}],
        });
        let adapter = MockLlmAdapter::single_plan(json!({}), answer_json);

        let answer = generate(&adapter, "how many rows?", &[tool_result], &VerifierReport::default(), "")
            .await
            .unwrap();
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].evidence_type, EvidenceType::ToolResult);
    }

    #[tokio::test]
    async fn rejects_answer_citing_unknown_evidence() {
        let tool_result = make_tool_result();
        let answer_json = json!({
            "content": "There is 1 row [1].",
            "citations": [{"index": 1, "evidenceId": "not-a-real-id", "evidenceType": "tool_result"}],
        });
        let adapter = MockLlmAdapter::single_plan(json!({}), answer_json);

        let err = generate(&adapter, "how many rows?", &[tool_result], &VerifierReport::default(), "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn allows_empty_citations_when_no_tool_results() {
        let answer_json = json!({"content": "No data is available.", "citations": []});
        let adapter = MockLlmAdapter::single_plan(json!({}), answer_json);

        let answer = generate(&adapter, "anything?", &[], &VerifierReport::default(), "").await.unwrap();
        assert!(answer.citations.is_empty());
    }
}
