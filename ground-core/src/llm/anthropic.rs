//! Anthropic-backed `LlmAdapter`: a thin, real reference implementation.
//! Planning and answer generation both go through the same non-streaming
//! Messages endpoint; `stream_answer` assembles the whole answer first and
//! yields it as a single fragment, since true SSE passthrough is an
//! (external) HTTP-surface concern, not part of this adapter's contract.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ToolResult, VerifierReport};
use crate::error::{Error, Result};

use super::adapter::{AnswerFragmentStream, LlmAdapter};

fn build_http_client(timeout_secs: u64) -> Client {
    let timeout = Duration::from_secs(timeout_secs);

    // Some sandboxed environments panic during proxy auto-detection in
    // reqwest's default client builder; fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => client,
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client"),
    }
}

/// Configuration for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
            timeout_secs: 120,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub struct AnthropicLlmAdapter {
    config: AnthropicConfig,
    http: Client,
}

impl AnthropicLlmAdapter {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(config: AnthropicConfig) -> Self {
        let http = build_http_client(config.timeout_secs);
        Self { config, http }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(Self::DEFAULT_BASE_URL)
    }

    async fn complete_json(&self, system: String, user: String, temperature: f64) -> Result<Value> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user,
            }],
            max_tokens: 4096,
            system: Some(system),
            temperature: Some(temperature),
        };

        let url = format!("{}/v1/messages", self.base_url());

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LlmAdapter(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::LlmAdapter(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Error::LlmAdapter(format!("Anthropic API error ({status}): {body}")));
        }

        let parsed: AnthropicResponse =
            serde_json::from_str(&body).map_err(|e| Error::LlmAdapter(format!("failed to parse response: {e}")))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        extract_json(&text)
    }
}

/// Pull the first top-level JSON object out of free-form model output, in
/// case the model wraps it in prose or a fenced code block.
fn extract_json(text: &str) -> Result<Value> {
    let start = text
        .find('{')
        .ok_or_else(|| Error::LlmAdapter("no JSON object found in model output".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| Error::LlmAdapter("no JSON object found in model output".to_string()))?;
    if end < start {
        return Err(Error::LlmAdapter("malformed JSON object in model output".to_string()));
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| Error::LlmAdapter(format!("invalid JSON in model output: {e}")))
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

const PLAN_SYSTEM_PROMPT: &str = "You plan tool calls to answer a user's question. \
Respond with a single JSON object matching: {\"intent\": string, \"actions\": \
[{\"tool\": string, \"args\": object, \"reason\": string}], \"needsClarification\": \
bool, \"clarificationQuestion\": string}. Emit nothing but the JSON object.";

const ANSWER_SYSTEM_PROMPT: &str = "You write a final answer grounded only in the \
provided tool results. Cite every factual statement with a bracketed index, e.g. \
[1], whose corresponding citation appears in the JSON. Respond with a single JSON \
object matching: {\"content\": string, \"citations\": [{\"index\": number, \
\"evidenceId\": string, \"evidenceType\": \"tool_result\"|\"chunk\", \"label\": \
string}], \"followUps\": [string]}. Emit nothing but the JSON object.";

#[async_trait]
impl LlmAdapter for AnthropicLlmAdapter {
    async fn generate_plan(
        &self,
        user_message: &str,
        system_context: &str,
        allowed_tools: &[String],
        temperature: f64,
    ) -> Result<Value> {
        let system = format!("{PLAN_SYSTEM_PROMPT}\nAllowed tools: {}.\n{system_context}", allowed_tools.join(", "));
        self.complete_json(system, user_message.to_string(), temperature).await
    }

    async fn generate_answer(
        &self,
        user_message: &str,
        tool_results: &[ToolResult],
        verifier_report: &VerifierReport,
        system_context: &str,
    ) -> Result<Value> {
        let evidence = serde_json::to_string(tool_results).unwrap_or_default();
        let verification = serde_json::to_string(verifier_report).unwrap_or_default();
        let user = format!(
            "User question: {user_message}\nTool results: {evidence}\nVerification: {verification}"
        );
        let system = format!("{ANSWER_SYSTEM_PROMPT}\n{system_context}");
        self.complete_json(system, user, 0.1).await
    }

    fn stream_answer(
        &self,
        user_message: &str,
        tool_results: &[ToolResult],
        verifier_report: &VerifierReport,
        system_context: &str,
    ) -> AnswerFragmentStream {
        let user_message = user_message.to_string();
        let tool_results = tool_results.to_vec();
        let verifier_report = verifier_report.clone();
        let system_context = system_context.to_string();
        let config = self.config.clone();
        let http = self.http.clone();

        Box::pin(stream! {
            let adapter = AnthropicLlmAdapter { config, http };
            match adapter
                .generate_answer(&user_message, &tool_results, &verifier_report, &system_context)
                .await
            {
                Ok(answer) => {
                    let content = answer.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
                    yield Ok(content);
                }
                Err(e) => yield Err(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_fenced_prose() {
        let text = "Sure, here you go:\n```json\n{\"intent\": \"count\"}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["intent"], "count");
    }

    #[test]
    fn rejects_text_without_json() {
        assert!(extract_json("no json here").is_err());
    }
}
