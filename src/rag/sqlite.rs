//! SQLite-backed chunk store.
//!
//! Metadata lives in SQLite; embeddings are stored as little-endian f32
//! blobs and ranked with brute-force cosine similarity at query time.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkRecord, RagStore, ScoredChunk};
use crate::core::config::AppPaths;
use crate::core::errors::AppError;

pub struct SqliteRagStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteRagStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, AppError> {
        Self::with_path(paths.vector_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(AppError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                page INTEGER NOT NULL DEFAULT 0,
                composition TEXT NOT NULL DEFAULT 'N/A',
                process TEXT NOT NULL DEFAULT 'N/A',
                property TEXT NOT NULL DEFAULT 'N/A',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(AppError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> ChunkRecord {
        let page: i64 = row.get("page");
        ChunkRecord {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            page: page.max(0) as u32,
            composition: row.get("composition"),
            process: row.get("process"),
            property: row.get("property"),
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(ChunkRecord, Vec<f32>)>) -> Result<usize, AppError> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(AppError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO chunks
                     (chunk_id, content, source, page, composition, process, property, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(chunk.page as i64)
            .bind(&chunk.composition)
            .bind(&chunk.process)
            .bind(&chunk.property)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        }

        tx.commit().await.map_err(AppError::internal)?;
        Ok(items.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, page, composition, process, property, embedding
             FROM chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::internal)?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                Some(ScoredChunk {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::internal)?;
        Ok(count as usize)
    }

    async fn sources(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT DISTINCT source FROM chunks ORDER BY source")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::internal)?;
        Ok(rows.iter().map(|row| row.get("source")).collect())
    }

    async fn clear(&self) -> Result<usize, AppError> {
        let result = sqlx::query("DELETE FROM chunks")
            .execute(&self.pool)
            .await
            .map_err(AppError::internal)?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (SqliteRagStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::with_path(dir.path().join("vectordb.db"))
            .await
            .unwrap();
        (store, dir)
    }

    fn make_chunk(content: &str, source: &str, page: u32) -> ChunkRecord {
        ChunkRecord::new(content.to_string(), source.to_string(), page)
    }

    #[tokio::test]
    async fn insert_and_search_ranks_by_similarity() {
        let (store, _dir) = test_store().await;

        store
            .insert_batch(vec![
                (make_chunk("copper alloy", "a.pdf", 1), vec![1.0, 0.0, 0.0]),
                (make_chunk("titanium", "a.pdf", 2), vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "copper alloy");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn duplicate_chunks_are_overwritten_not_duplicated() {
        let (store, _dir) = test_store().await;

        let chunk = make_chunk("same text", "a.pdf", 1);
        store
            .insert_batch(vec![(chunk.clone(), vec![1.0])])
            .await
            .unwrap();
        store.insert_batch(vec![(chunk, vec![1.0])]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sources_and_clear() {
        let (store, _dir) = test_store().await;

        store
            .insert_batch(vec![
                (make_chunk("x", "b.pdf", 1), vec![1.0]),
                (make_chunk("y", "a.pdf", 1), vec![1.0]),
                (make_chunk("z", "a.pdf", 2), vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.sources().await.unwrap(), vec!["a.pdf", "b.pdf"]);

        let removed = store.clear().await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_skips_rows_without_embeddings() {
        let (store, _dir) = test_store().await;

        store
            .insert_batch(vec![(make_chunk("has embedding", "a.pdf", 1), vec![1.0])])
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO chunks (chunk_id, content, source, page, embedding)
             VALUES ('raw', 'no embedding', 'a.pdf', 2, X'')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let results = store.search(&[1.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "has embedding");
    }
}
