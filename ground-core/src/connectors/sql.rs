//! SqlConnector: the built-in `sql.query` tool, backed by `rusqlite`
//! standing in for an external warehouse connection (spec §4.6).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{types::ValueRef, Connection};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// SQLite has no `statement_timeout`; `busy_timeout` is the closest
/// equivalent available to a single-connection driver, bounding how long a
/// query waits on a lock before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Executes read-only SQL against a connection and returns JSON rows.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn query(&self, sql: &str, max_rows: u32) -> Result<(Vec<Value>, i64)>;
}

/// `rusqlite`-backed connector. Blocking calls are pushed onto
/// `spawn_blocking` since `rusqlite::Connection` is not `Send` across an
/// await point when held across a lock guard.
pub struct SqliteSqlConnector {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSqlConnector {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run arbitrary DDL/DML to seed a connector in tests.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Internal("sqlite connection lock poisoned".to_string()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[async_trait]
impl SqlConnector for SqliteSqlConnector {
    async fn query(&self, sql: &str, max_rows: u32) -> Result<(Vec<Value>, i64)> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || run_query(&conn, &sql, max_rows))
            .await
            .map_err(|e| Error::tool_execution("sql.query", format!("blocking task panicked: {e}")))?
    }
}

fn run_query(conn: &Mutex<Connection>, sql: &str, max_rows: u32) -> Result<(Vec<Value>, i64)> {
    let conn = conn
        .lock()
        .map_err(|_| Error::Internal("sqlite connection lock poisoned".to_string()))?;

    conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS as u64))?;
    conn.pragma_update(None, "query_only", "ON")?;

    let result = run_query_locked(&conn, sql, max_rows);

    // Reset before the connection goes back into the pool of one, regardless
    // of whether the query itself succeeded.
    if let Err(e) = conn.pragma_update(None, "query_only", "OFF") {
        tracing::warn!(error = %e, "failed to reset query_only pragma after sql.query");
    }

    result
}

fn run_query_locked(conn: &Connection, sql: &str, max_rows: u32) -> Result<(Vec<Value>, i64)> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let rows = stmt.query_map([], |row| {
        let mut obj = Map::new();
        for (i, name) in column_names.iter().enumerate() {
            obj.insert(name.clone(), sqlite_value_to_json(row.get_ref(i)?));
        }
        Ok(Value::Object(obj))
    })?;

    let mut collected = Vec::new();
    for row in rows {
        if collected.len() >= max_rows as usize {
            break;
        }
        collected.push(row?);
    }

    let row_count = collected.len() as i64;
    Ok((collected, row_count))
}

fn sqlite_value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queries_seeded_table() {
        let connector = SqliteSqlConnector::in_memory().unwrap();
        connector
            .execute_batch("CREATE TABLE workspaces (id INTEGER, name TEXT); INSERT INTO workspaces VALUES (1, 'alpha'), (2, 'beta')")
            .unwrap();

        let (rows, row_count) = connector.query("SELECT * FROM workspaces ORDER BY id", 10).await.unwrap();
        assert_eq!(row_count, 2);
        assert_eq!(rows[0]["name"], "alpha");
    }

    #[tokio::test]
    async fn resets_query_only_pragma_after_query() {
        let connector = SqliteSqlConnector::in_memory().unwrap();
        connector.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();

        connector.query("SELECT * FROM t", 10).await.unwrap();

        // query_only must be OFF again so the connector can still seed/mutate
        // state between tool calls (e.g. via execute_batch in tests, or a
        // future write-capable tool sharing this connection).
        connector.execute_batch("INSERT INTO t VALUES (1)").unwrap();
        let (rows, row_count) = connector.query("SELECT * FROM t", 10).await.unwrap();
        assert_eq!(row_count, 1);
        assert_eq!(rows[0]["n"], 1);
    }

    #[tokio::test]
    async fn query_only_rejects_writes_issued_through_the_query_path() {
        let connector = SqliteSqlConnector::in_memory().unwrap();
        connector.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();

        let err = connector.query("INSERT INTO t VALUES (1)", 10).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("read-only") || err.to_string().to_lowercase().contains("readonly"));
    }

    #[tokio::test]
    async fn truncates_to_max_rows() {
        let connector = SqliteSqlConnector::in_memory().unwrap();
        connector
            .execute_batch("CREATE TABLE t (n INTEGER); INSERT INTO t VALUES (1), (2), (3), (4)")
            .unwrap();

        let (rows, row_count) = connector.query("SELECT * FROM t", 2).await.unwrap();
        assert_eq!(row_count, 2);
        assert_eq!(rows.len(), 2);
    }
}
