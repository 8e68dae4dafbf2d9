//! LLM adapter contract and reference implementations (ambient stack).

mod adapter;
mod anthropic;

pub use adapter::{AnswerFragmentStream, LlmAdapter};
pub use anthropic::{AnthropicConfig, AnthropicLlmAdapter};

#[cfg(test)]
pub use adapter::mock::MockLlmAdapter;
