//! EvidenceStore: append-only, best-effort audit persistence for
//! `ToolCall`, `ToolResult`, and final messages (spec §6, ambient stack).
//! Writes never abort the response stream; failures are logged and
//! swallowed by the caller (the Coordinator), per spec §5's shared-resource
//! rules.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{ToolCall, ToolResult};
use crate::error::Result;

const SCHEMA_VERSION: i32 = 1;

/// Persists the audit trail. Implementations MUST be safe to call from a
/// shared, process-wide instance.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn insert_tool_call(&self, call: &ToolCall) -> Result<()>;
    async fn insert_tool_result(&self, result: &ToolResult) -> Result<()>;
    async fn insert_message(&self, thread_id: &str, message_id: &str, role: &str, content: &str) -> Result<()>;
}

/// `rusqlite`-backed store, WAL mode, versioned schema migration.
pub struct SqliteEvidenceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEvidenceStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| crate::error::Error::Internal("evidence store connection lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);

    if current_version < SCHEMA_VERSION {
        apply_v1_schema(conn)?;
    }

    Ok(())
}

fn apply_v1_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tool_calls (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            thread_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            tool_name TEXT NOT NULL,
            tool_args TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            duration_ms INTEGER,
            error_message TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tool_results (
            id TEXT PRIMARY KEY,
            tool_call_id TEXT NOT NULL REFERENCES tool_calls(id),
            thread_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            data TEXT NOT NULL,
            row_count INTEGER,
            checksum TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_tool_calls_thread ON tool_calls(thread_id)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_tool_results_call ON tool_results(tool_call_id)", [])?;

    conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;

    Ok(())
}

#[async_trait]
impl EvidenceStore for SqliteEvidenceStore {
    async fn insert_tool_call(&self, call: &ToolCall) -> Result<()> {
        let call = call.clone();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| crate::error::Error::Internal("lock poisoned".to_string()))?;
            guard.execute(
                "INSERT OR REPLACE INTO tool_calls (
                    id, message_id, thread_id, workspace_id, tool_name, tool_args,
                    status, started_at, finished_at, duration_ms, error_message
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    call.id.to_string(),
                    call.message_id,
                    call.thread_id.to_string(),
                    call.workspace_id.to_string(),
                    call.tool_name,
                    serde_json::to_string(&call.tool_args).unwrap_or_default(),
                    format!("{:?}", call.status),
                    call.started_at.to_rfc3339(),
                    call.finished_at.map(|t| t.to_rfc3339()),
                    call.duration_ms,
                    call.error_message,
                ],
            )?;
            Ok::<_, crate::error::Error>(())
        })
        .await
        .map_err(|e| crate::error::Error::Internal(format!("blocking task panicked: {e}")))??;
        Ok(())
    }

    async fn insert_tool_result(&self, result: &ToolResult) -> Result<()> {
        let result = result.clone();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO tool_results (
                    id, tool_call_id, thread_id, workspace_id, data, row_count, checksum
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    result.id.to_string(),
                    result.tool_call_id.to_string(),
                    result.thread_id.to_string(),
                    result.workspace_id.to_string(),
                    serde_json::to_string(&result.data).unwrap_or_default(),
                    result.row_count,
                    result.checksum,
                ],
            )?;
            Ok(())
        })
    }

    async fn insert_message(&self, thread_id: &str, message_id: &str, role: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO messages (id, thread_id, role, content) VALUES (?1, ?2, ?3, ?4)",
                params![message_id, thread_id, role, content],
            )?;
            Ok(())
        })
    }
}

/// No-op store for deployments that don't need an audit trail.
pub struct NullEvidenceStore;

#[async_trait]
impl EvidenceStore for NullEvidenceStore {
    async fn insert_tool_call(&self, _call: &ToolCall) -> Result<()> {
        Ok(())
    }

    async fn insert_tool_result(&self, _result: &ToolResult) -> Result<()> {
        Ok(())
    }

    async fn insert_message(&self, _thread_id: &str, _message_id: &str, _role: &str, _content: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ThreadId, WorkspaceId};
    use serde_json::{json, Map};

    #[tokio::test]
    async fn persists_tool_call_and_result() {
        let store = SqliteEvidenceStore::in_memory().unwrap();
        let thread_id = ThreadId::new();
        let workspace_id = WorkspaceId::new();
        let mut call = ToolCall::start("m1", thread_id, workspace_id, "sql.query", Map::new());
        call.finish_success();

        store.insert_tool_call(&call).await.unwrap();

        let result = ToolResult::new(call.id, thread_id, workspace_id, json!([{"n": 1}])).with_row_count(1);
        store.insert_tool_result(&result).await.unwrap();
    }

    #[tokio::test]
    async fn null_store_always_succeeds() {
        let store = NullEvidenceStore;
        let thread_id = ThreadId::new();
        let workspace_id = WorkspaceId::new();
        let call = ToolCall::start("m1", thread_id, workspace_id, "sql.query", Map::new());
        store.insert_tool_call(&call).await.unwrap();
    }

    #[tokio::test]
    async fn survives_reopening_a_disk_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.sqlite3");

        let thread_id = ThreadId::new();
        let workspace_id = WorkspaceId::new();
        let call = ToolCall::start("m1", thread_id, workspace_id, "sql.query", Map::new());

        {
            let store = SqliteEvidenceStore::open(&path).unwrap();
            store.insert_tool_call(&call).await.unwrap();
        }

        // Reopening must re-run schema migration idempotently rather than fail.
        let store = SqliteEvidenceStore::open(&path).unwrap();
        let other_call = ToolCall::start("m1", thread_id, workspace_id, "rag.search", Map::new());
        store.insert_tool_call(&other_call).await.unwrap();
    }
}
