//! EvidenceCheck and VerifierReport: the structural grounding check.

use serde::{Deserialize, Serialize};

/// The kind of evidence item a `Citation` or `EvidenceCheck` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    ToolResult,
    Chunk,
}

/// One structural check performed by the Verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCheck {
    pub claim: String,
    pub supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<EvidenceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EvidenceCheck {
    pub fn supported(claim: impl Into<String>, evidence_id: impl Into<String>, evidence_type: EvidenceType) -> Self {
        Self {
            claim: claim.into(),
            supported: true,
            evidence_id: Some(evidence_id.into()),
            evidence_type: Some(evidence_type),
            reason: None,
        }
    }

    pub fn unsupported(claim: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            supported: false,
            evidence_id: None,
            evidence_type: None,
            reason: Some(reason.into()),
        }
    }
}

/// The Verifier's structural report on whether enough usable evidence
/// exists for the Answer Generator to make grounded claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifierReport {
    pub approved: bool,
    pub checks: Vec<EvidenceCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<String>,
}
