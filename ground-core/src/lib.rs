//! # ground-core
//!
//! An evidence-grounded orchestration pipeline: a request is planned,
//! its planned tool calls are policy-gated (an AST-based SQL safety gate
//! plus a tool allowlist), approved calls are executed through a bounded
//! concurrent tool runtime with per-call timeouts and audit persistence,
//! the results are structurally verified for grounding, and a cited
//! answer is streamed back as incremental events.
//!
//! ## Core components
//!
//! - **domain**: the immutable data model — Plan, PolicyDecision,
//!   ToolCall/ToolResult, VerifierReport, Answer.
//! - **validate**: schema validators, the sole gate between untrusted
//!   LLM-produced JSON and the typed domain.
//! - **sql_gate** / **tool_gate** / **policy_engine**: the Policy Engine
//!   and its two gates.
//! - **planner** / **answer_generator**: the two stages that call through
//!   the `LlmAdapter` seam.
//! - **tool_runtime** / **connectors**: dispatch of approved tool calls.
//! - **verifier**: the structural grounding check.
//! - **coordinator** / **stream_event**: the state machine tying every
//!   stage together into one ordered event stream.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ground_core::{PipelineCoordinator, RunContext, CancellationFlag};
//! use futures::StreamExt;
//!
//! let mut events = coordinator.run(ctx, CancellationFlag::new());
//! while let Some(event) = events.next().await {
//!     // forward `event` to the (external) SSE surface
//! }
//! ```

pub mod answer_generator;
pub mod config;
pub mod connectors;
pub mod context;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod evidence_store;
pub mod llm;
pub mod planner;
pub mod policy_engine;
pub mod sql_gate;
pub mod stream_event;
pub mod tool_gate;
pub mod tool_runtime;
pub mod validate;
pub mod verifier;

pub use config::PipelineConfig;
pub use context::RunContext;
pub use coordinator::{CancellationFlag, PipelineCoordinator};
pub use error::{Error, Result};
pub use evidence_store::{EvidenceStore, NullEvidenceStore, SqliteEvidenceStore};
pub use llm::{AnthropicConfig, AnthropicLlmAdapter, AnswerFragmentStream, LlmAdapter};
pub use stream_event::StreamEvent;
pub use tool_runtime::{RagToolConnector, SqlToolConnector, ToolConnector, ToolRuntime};

pub use domain::{
    Answer, Citation, EvidenceCheck, EvidenceType, MessageId, Plan, PlanAction, PlanConstraints,
    PolicyDecision, ThreadId, ToolCall, ToolCallId, ToolCallStatus, ToolExecutionResult, ToolResult,
    ToolResultId, VerifierReport, WorkspaceId,
};

#[cfg(test)]
pub use llm::MockLlmAdapter;
