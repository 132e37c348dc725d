//! Persistent vector store for ingested paper chunks.

pub mod sqlite;
pub mod store;

pub use sqlite::SqliteRagStore;
pub use store::{ChunkRecord, RagStore, ScoredChunk, CPP_UNKNOWN};
