//! The immutable data model that flows through the pipeline stages.
//!
//! `UserMessage → Plan → PolicyDecisions → ToolExecutionResults →
//! VerifierReport → Answer`. Every entity here is produced once by the
//! stage that owns it and consumed by reference downstream.

mod answer;
mod evidence;
mod ids;
mod plan;
mod policy;
mod tool;

pub use answer::{Answer, Citation};
pub use evidence::{EvidenceCheck, EvidenceType, VerifierReport};
pub use ids::{MessageId, ThreadId, ToolCallId, ToolResultId, WorkspaceId};
pub use plan::{Plan, PlanAction, PlanConstraints};
pub use policy::PolicyDecision;
pub use tool::{ToolCall, ToolCallStatus, ToolExecutionResult, ToolResult};
