//! LlmAdapter: the pipeline's one LLM seam. The Planner and Answer
//! Generator never talk to a provider directly, so tests and alternate
//! providers can swap in a fake implementation (spec §4.5/§4.8, §9).

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::domain::{ToolResult, VerifierReport};
use crate::error::Result;

pub type AnswerFragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The single LLM seam the Planner and Answer Generator call through.
///
/// Implementors are contractually forbidden from inventing facts in
/// `generate_answer`: every factual statement in the returned `content`
/// MUST cite an index whose `Citation` is present in `citations`. The core
/// cannot enforce this at the type level, only validate the returned shape
/// (see `validate::validate_answer`) and the citation subset-invariant.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Ask the adapter for a `Plan`, as raw JSON (validated by the caller).
    async fn generate_plan(
        &self,
        user_message: &str,
        system_context: &str,
        allowed_tools: &[String],
        temperature: f64,
    ) -> Result<Value>;

    /// Ask the adapter for an `Answer`, as raw JSON (validated by the caller).
    async fn generate_answer(
        &self,
        user_message: &str,
        tool_results: &[ToolResult],
        verifier_report: &VerifierReport,
        system_context: &str,
    ) -> Result<Value>;

    /// Stream the answer as fragments. Implementations that cannot stream
    /// natively MAY emit the whole answer as a single fragment.
    fn stream_answer(
        &self,
        user_message: &str,
        tool_results: &[ToolResult],
        verifier_report: &VerifierReport,
        system_context: &str,
    ) -> AnswerFragmentStream;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use async_stream::stream;
    use std::sync::Mutex;

    /// Test double returning canned responses, optionally one per call so a
    /// Planner retry-with-feedback loop can be exercised.
    pub struct MockLlmAdapter {
        plan_responses: Mutex<Vec<Value>>,
        answer_response: Value,
    }

    impl MockLlmAdapter {
        pub fn new(plan_responses: Vec<Value>, answer_response: Value) -> Self {
            Self {
                plan_responses: Mutex::new(plan_responses),
                answer_response,
            }
        }

        pub fn single_plan(plan: Value, answer: Value) -> Self {
            Self::new(vec![plan], answer)
        }
    }

    #[async_trait]
    impl LlmAdapter for MockLlmAdapter {
        async fn generate_plan(
            &self,
            _user_message: &str,
            _system_context: &str,
            _allowed_tools: &[String],
            _temperature: f64,
        ) -> Result<Value> {
            let mut responses = self.plan_responses.lock().unwrap();
            if responses.is_empty() {
                return Err(crate::error::Error::LlmAdapter("mock exhausted".into()));
            }
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            Ok(next)
        }

        async fn generate_answer(
            &self,
            _user_message: &str,
            _tool_results: &[ToolResult],
            _verifier_report: &VerifierReport,
            _system_context: &str,
        ) -> Result<Value> {
            Ok(self.answer_response.clone())
        }

        fn stream_answer(
            &self,
            _user_message: &str,
            _tool_results: &[ToolResult],
            _verifier_report: &VerifierReport,
            _system_context: &str,
        ) -> AnswerFragmentStream {
            let content = self
                .answer_response
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Box::pin(stream! {
                yield Ok(content);
            })
        }
    }
}
