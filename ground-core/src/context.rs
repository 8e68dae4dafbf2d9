//! RunContext: the read-only identity of one orchestration run.

use serde::{Deserialize, Serialize};

use crate::domain::{ThreadId, WorkspaceId};

/// Per-request context, created once and read throughout the run.
///
/// Owned exclusively by the Pipeline Coordinator (spec §3); every other
/// stage receives it by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub workspace_id: WorkspaceId,
    pub thread_id: ThreadId,
    pub message_id: String,
    pub user_message: String,
    #[serde(default)]
    pub allowed_sources: Vec<String>,
}

/// Upper bound on `RunContext.user_message` length, per spec §4.1.
pub const MAX_USER_MESSAGE_CHARS: usize = 10_000;

impl RunContext {
    pub fn new(
        workspace_id: WorkspaceId,
        thread_id: ThreadId,
        message_id: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id,
            thread_id,
            message_id: message_id.into(),
            user_message: user_message.into(),
            allowed_sources: Vec::new(),
        }
    }

    pub fn with_allowed_sources(mut self, sources: Vec<String>) -> Self {
        self.allowed_sources = sources;
        self
    }

    /// `userMessage ≤ 10,000` chars, per spec §4.1's string limits.
    pub fn is_within_message_limit(&self) -> bool {
        self.user_message.chars().count() <= MAX_USER_MESSAGE_CHARS
    }
}
