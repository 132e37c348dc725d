//! End-to-end ingestion: PDFs -> chunks -> C-P-P metadata -> embeddings -> store.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::chunker::{chunk_pages, ChunkingConfig};
use super::extract::CppExtractor;
use super::pdf::load_pdfs;
use crate::core::config::service::{get_bool, get_u64};
use crate::core::errors::AppError;
use crate::llm::LlmProvider;
use crate::rag::{ChunkRecord, RagStore};

/// What an ingestion run did, for CLI and API reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
    pub stored: usize,
    /// Chunks whose C-P-P extraction fell back to defaults.
    pub extraction_failures: usize,
}

pub struct IngestOptions {
    /// Run C-P-P extraction per chunk (slow, one LLM call each).
    pub extract_cpp: bool,
    /// Clear the store before ingesting.
    pub recreate: bool,
}

pub struct IngestPipeline {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    chunking: ChunkingConfig,
    embed_batch_size: usize,
    config: Value,
}

impl IngestPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, store: Arc<dyn RagStore>, config: &Value) -> Self {
        Self {
            provider,
            store,
            chunking: ChunkingConfig::from_config(config),
            embed_batch_size: get_u64(config, &["ingest", "embed_batch_size"], 16).max(1) as usize,
            config: config.clone(),
        }
    }

    pub fn default_options(&self) -> IngestOptions {
        IngestOptions {
            extract_cpp: get_bool(&self.config, &["ingest", "extract_cpp"], true),
            recreate: false,
        }
    }

    /// Ingest a PDF file or a directory of PDFs.
    pub async fn run(&self, path: &Path, options: &IngestOptions) -> Result<IngestReport, AppError> {
        if options.recreate {
            let removed = self.store.clear().await?;
            tracing::info!("Cleared {} existing chunks before re-ingestion", removed);
        }

        let pages = load_pdfs(path)?;
        let mut chunks = chunk_pages(&pages, &self.chunking);
        if chunks.is_empty() {
            return Err(AppError::BadRequest(format!(
                "No text extracted from {}",
                path.display()
            )));
        }

        let mut report = IngestReport {
            pages: pages.len(),
            chunks: chunks.len(),
            ..Default::default()
        };

        if options.extract_cpp {
            report.extraction_failures = self.annotate_cpp(&mut chunks).await;
        }

        report.stored = self.embed_and_store(chunks).await?;
        tracing::info!(
            "Ingested {}: {} pages, {} chunks, {} stored",
            path.display(),
            report.pages,
            report.chunks,
            report.stored
        );
        Ok(report)
    }

    async fn annotate_cpp(&self, chunks: &mut [ChunkRecord]) -> usize {
        let extractor = CppExtractor::new(self.provider.clone(), &self.config);
        let total = chunks.len();
        let mut failures = 0usize;

        for (index, chunk) in chunks.iter_mut().enumerate() {
            let extraction = extractor.extract(&chunk.content).await;
            if extraction.degraded {
                failures += 1;
            }
            chunk.composition = extraction.record.composition;
            chunk.process = extraction.record.process;
            chunk.property = extraction.record.property;

            if (index + 1) % 10 == 0 || index + 1 == total {
                tracing::info!("C-P-P extraction: {}/{} chunks", index + 1, total);
            }
        }

        failures
    }

    async fn embed_and_store(&self, chunks: Vec<ChunkRecord>) -> Result<usize, AppError> {
        let mut stored = 0usize;

        for batch in chunks.chunks(self.embed_batch_size) {
            let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.provider.embed(&inputs).await?;
            if embeddings.len() != batch.len() {
                return Err(AppError::Internal(format!(
                    "Embedding count mismatch: {} inputs, {} vectors",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let items: Vec<(ChunkRecord, Vec<f32>)> =
                batch.iter().cloned().zip(embeddings).collect();
            stored += self.store.insert_batch(items).await?;
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::llm::ChatRequest;
    use crate::rag::SqliteRagStore;

    struct FakeProvider {
        replies: Mutex<VecDeque<String>>,
        /// Return one vector fewer than requested, as a misbehaving
        /// embedding endpoint would.
        short_embed: bool,
    }

    impl FakeProvider {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                short_embed: false,
            }
        }

        fn short_embedder() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                short_embed: true,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<bool, AppError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, AppError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Internal("no reply scripted".to_string()))
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            let count = if self.short_embed {
                inputs.len().saturating_sub(1)
            } else {
                inputs.len()
            };
            Ok((0..count).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn pipeline_with(
        provider: FakeProvider,
        config: serde_json::Value,
    ) -> (IngestPipeline, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::with_path(dir.path().join("vectordb.db"))
            .await
            .unwrap();
        let pipeline = IngestPipeline::new(Arc::new(provider), Arc::new(store), &config);
        (pipeline, dir)
    }

    fn chunk(content: &str, page: u32) -> ChunkRecord {
        ChunkRecord::new(content.to_string(), "paper.pdf".to_string(), page)
    }

    #[tokio::test]
    async fn annotation_counts_only_degraded_chunks() {
        let provider = FakeProvider::new(vec![
            r#"{"composition": "Cu, Mg", "process": "sputtering", "property": "low resistivity"}"#,
            "not json at all",
        ]);
        let (pipeline, _dir) = pipeline_with(provider, json!({})).await;

        let mut chunks = vec![chunk("cu mg text", 1), chunk("unrelated text", 2)];
        let failures = pipeline.annotate_cpp(&mut chunks).await;

        assert_eq!(failures, 1);
        assert_eq!(chunks[0].composition, "Cu, Mg");
        assert_eq!(chunks[1].composition, "N/A");
    }

    #[tokio::test]
    async fn embedding_batches_are_stored() {
        let config = json!({ "ingest": { "embed_batch_size": 2 } });
        let (pipeline, _dir) = pipeline_with(FakeProvider::new(vec![]), config).await;

        let chunks = vec![chunk("one", 1), chunk("two", 2), chunk("three", 3)];
        let stored = pipeline.embed_and_store(chunks).await.unwrap();

        assert_eq!(stored, 3);
        assert_eq!(pipeline.store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn embedding_count_mismatch_is_an_error() {
        let (pipeline, _dir) = pipeline_with(FakeProvider::short_embedder(), json!({})).await;

        let err = pipeline
            .embed_and_store(vec![chunk("one", 1), chunk("two", 2)])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("mismatch"));
        assert_eq!(pipeline.store.count().await.unwrap(), 0);
    }
}
