//! RagConnector: the built-in `rag.search` tool over an in-memory chunk
//! index (spec §4.6). A real deployment would swap this for a vector-store
//! backed implementation; the trait is the seam.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::Result;

/// One retrievable chunk of source material.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    pub text: String,
}

#[async_trait]
pub trait RagConnector: Send + Sync {
    async fn search(&self, query: &str, source_ids: &[String], max_rows: u32) -> Result<(Vec<Value>, i64)>;
}

/// Naive substring-match retriever over a fixed chunk set, useful as a
/// reference implementation and in tests.
pub struct InMemoryRagConnector {
    chunks: Vec<Chunk>,
}

impl InMemoryRagConnector {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl RagConnector for InMemoryRagConnector {
    async fn search(&self, query: &str, source_ids: &[String], max_rows: u32) -> Result<(Vec<Value>, i64)> {
        let query_lower = query.to_lowercase();
        let matches: Vec<&Chunk> = self
            .chunks
            .iter()
            .filter(|c| source_ids.is_empty() || source_ids.contains(&c.source_id))
            .filter(|c| c.text.to_lowercase().contains(&query_lower))
            .take(max_rows as usize)
            .collect();

        let row_count = matches.len() as i64;
        let rows = matches
            .into_iter()
            .map(|c| {
                let mut obj = Map::new();
                obj.insert("chunkId".to_string(), json!(c.id));
                obj.insert("sourceId".to_string(), json!(c.source_id));
                obj.insert("text".to_string(), json!(c.text));
                Value::Object(obj)
            })
            .collect();

        Ok((rows, row_count))
    }
}
