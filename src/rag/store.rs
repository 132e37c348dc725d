//! RagStore trait — abstract interface for the chunk vector store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::AppError;

pub const CPP_UNKNOWN: &str = "N/A";

/// A stored text chunk with its provenance and extracted C-P-P metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Content-addressed identifier; identical content from the same source
    /// page maps to the same id, which makes re-ingestion idempotent.
    pub chunk_id: String,
    pub content: String,
    /// Source file name.
    pub source: String,
    /// 1-based page number within the source.
    pub page: u32,
    pub composition: String,
    pub process: String,
    pub property: String,
}

impl ChunkRecord {
    pub fn new(content: String, source: String, page: u32) -> Self {
        let chunk_id = Self::derive_id(&content, &source, page);
        Self {
            chunk_id,
            content,
            source,
            page,
            composition: CPP_UNKNOWN.to_string(),
            process: CPP_UNKNOWN.to_string(),
            property: CPP_UNKNOWN.to_string(),
        }
    }

    pub fn derive_id(content: &str, source: &str, page: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.trim().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(page.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: ChunkRecord,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their embedding vectors. Returns the number of
    /// rows written; duplicates (same chunk id) are overwritten.
    async fn insert_batch(&self, items: Vec<(ChunkRecord, Vec<f32>)>) -> Result<usize, AppError>;

    /// Rank all stored chunks against the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, AppError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, AppError>;

    /// Distinct source file names in the store.
    async fn sources(&self) -> Result<Vec<String>, AppError>;

    /// Delete all stored chunks. Returns the number removed.
    async fn clear(&self) -> Result<usize, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_is_stable_and_distinguishes_pages() {
        let a = ChunkRecord::derive_id("same text", "paper.pdf", 1);
        let b = ChunkRecord::derive_id("same text", "paper.pdf", 1);
        let c = ChunkRecord::derive_id("same text", "paper.pdf", 2);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn derive_id_ignores_surrounding_whitespace() {
        let a = ChunkRecord::derive_id("text", "p.pdf", 1);
        let b = ChunkRecord::derive_id("  text\n", "p.pdf", 1);
        assert_eq!(a, b);
    }
}
