//! Answer and Citation: the final, validated, cited response.

use serde::{Deserialize, Serialize};

use super::evidence::EvidenceType;

/// A typed, indexed reference from `Answer.content` to one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Positive index matching the `[index]` marker in `content`.
    pub index: u32,
    pub evidence_id: String,
    pub evidence_type: EvidenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The Answer Generator's validated, citation-bearing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<String>,
}

impl Answer {
    pub fn absence_of_data(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            citations: Vec::new(),
            follow_ups: Vec::new(),
        }
    }
}
