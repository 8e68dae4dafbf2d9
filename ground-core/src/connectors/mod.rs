//! Built-in tool connectors (ambient stack, spec §4.6).

mod rag;
mod sql;

pub use rag::{Chunk, InMemoryRagConnector, RagConnector};
pub use sql::{SqlConnector, SqliteSqlConnector};
