//! Error types for ground-core.

use thiserror::Error;

/// Result type alias using ground-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the orchestration pipeline.
///
/// Each variant maps to a stable machine code and HTTP status per the
/// error taxonomy; see [`Error::code`] and [`Error::http_status`].
#[derive(Error, Debug)]
pub enum Error {
    /// The planner exhausted its retries against a misbehaving LLM adapter.
    #[error("planner failed after {retries} retries: {message}")]
    Planner {
        retries: u32,
        message: String,
        issues: Vec<String>,
    },

    /// The whole plan was rejected by the Tool Gate.
    #[error("policy blocked the plan: {message}")]
    PolicyBlocked { message: String },

    /// A candidate SQL statement failed to parse or violated policy.
    #[error("SQL safety error: {message}")]
    SqlSafety { message: String },

    /// A tool connector failed, timed out, or was unknown.
    #[error("tool execution error for '{tool}': {message}")]
    ToolExecution { tool: String, message: String },

    /// Every attempted tool execution failed.
    #[error("verification error: all {attempted} attempted tool executions failed")]
    Verification { attempted: usize },

    /// A referenced source (table, document set) was not available.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Schema validation rejected an entity before it could leave its stage.
    #[error("validation error: {0}")]
    Validation(String),

    /// The run was cancelled by its caller.
    #[error("run cancelled")]
    Cancelled,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite-backed connector or evidence store error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// LLM adapter transport error (network, malformed response).
    #[error("llm adapter error: {0}")]
    LlmAdapter(String),

    /// Internal invariant violation; should not occur in correct operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn planner(retries: u32, message: impl Into<String>, issues: Vec<String>) -> Self {
        Self::Planner {
            retries,
            message: message.into(),
            issues,
        }
    }

    pub fn policy_blocked(message: impl Into<String>) -> Self {
        Self::PolicyBlocked {
            message: message.into(),
        }
    }

    pub fn sql_safety(message: impl Into<String>) -> Self {
        Self::SqlSafety {
            message: message.into(),
        }
    }

    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn verification(attempted: usize) -> Self {
        Self::Verification { attempted }
    }

    /// The stable machine code for this error, as used by the (external)
    /// HTTP surface to build its response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Planner { .. } => "PLANNER_ERROR",
            Self::PolicyBlocked { .. } => "POLICY_BLOCKED",
            Self::SqlSafety { .. } => "SQL_SAFETY_ERROR",
            Self::ToolExecution { .. } => "TOOL_EXECUTION_ERROR",
            Self::Verification { .. } => "VERIFICATION_ERROR",
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Sqlite(_) => "STORAGE_ERROR",
            Self::LlmAdapter(_) => "LLM_ADAPTER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The HTTP status the (external) HTTP surface should report for this
    /// error, per spec §7.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Planner { .. } => 422,
            Self::PolicyBlocked { .. } => 403,
            Self::SqlSafety { .. } => 403,
            Self::ToolExecution { .. } => 500,
            Self::Verification { .. } => 422,
            Self::SourceNotFound(_) => 404,
            Self::Validation(_) => 422,
            Self::Cancelled => 499,
            Self::Serialization(_) => 500,
            Self::Sqlite(_) => 500,
            Self::LlmAdapter(_) => 502,
            Self::Internal(_) => 500,
        }
    }
}
