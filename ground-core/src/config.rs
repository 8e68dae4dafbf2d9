//! PipelineConfig: the recognized options from spec §6, with their
//! documented defaults and effects.

use serde::{Deserialize, Serialize};

/// Defence-in-depth SQL function blocklist, scanned as case-insensitive
/// substrings over the raw SQL text (spec §4.2 step 6). Chosen for a
/// Postgres-flavored SQL surface — see `SPEC_FULL.md`'s Open Question
/// resolution.
pub fn default_forbidden_functions() -> Vec<String> {
    [
        "sleep",
        "pg_sleep",
        "dblink",
        "lo_import",
        "lo_export",
        "copy",
        "pg_read_file",
        "pg_write_file",
        "set_config",
        "pg_terminate_backend",
        "pg_cancel_backend",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Tool allowlist the core ships with out of the box.
pub fn default_allowed_tools() -> Vec<String> {
    vec!["sql.query".to_string(), "rag.search".to_string()]
}

/// Bundles every configuration option recognized by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Row ceiling enforced at the SQL gate and by connectors.
    pub max_rows: u32,
    /// SQL table allowlist. Empty means permissive (local-dev concession).
    #[serde(default)]
    pub allowed_tables: Vec<String>,
    /// Tool name allowlist the Policy Engine enforces.
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
    /// Per-tool-call deadline.
    pub tool_timeout_ms: u64,
    /// Temperature passed to `LlmAdapter::generate_plan`.
    pub planner_temperature: f64,
    /// Planner validation retry budget.
    pub planner_max_retries: u32,
    /// Defence-in-depth SQL function blocklist.
    #[serde(default = "default_forbidden_functions")]
    pub forbidden_functions: Vec<String>,
    /// Whole-plan action cap enforced by the Tool Gate.
    pub max_tool_calls_per_plan: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rows: 200,
            allowed_tables: Vec::new(),
            allowed_tools: default_allowed_tools(),
            tool_timeout_ms: 30_000,
            planner_temperature: 0.1,
            planner_max_retries: 2,
            forbidden_functions: default_forbidden_functions(),
            max_tool_calls_per_plan: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_rows, 200);
        assert!(cfg.allowed_tables.is_empty());
        assert_eq!(cfg.allowed_tools, vec!["sql.query", "rag.search"]);
        assert_eq!(cfg.tool_timeout_ms, 30_000);
        assert_eq!(cfg.planner_max_retries, 2);
        assert_eq!(cfg.max_tool_calls_per_plan, 10);
    }
}
