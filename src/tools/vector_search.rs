//! Similarity search over the ingested paper chunks.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::Tool;
use crate::core::config::service::get_u64;
use crate::core::errors::AppError;
use crate::llm::LlmProvider;
use crate::rag::{RagStore, ScoredChunk, CPP_UNKNOWN};

const METADATA_PREVIEW_CHARS: usize = 200;

pub struct VectorSearchTool {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    top_k: usize,
    content_preview_chars: usize,
}

impl VectorSearchTool {
    pub fn new(provider: Arc<dyn LlmProvider>, store: Arc<dyn RagStore>, config: &Value) -> Self {
        Self {
            provider,
            store,
            top_k: get_u64(config, &["retrieval", "top_k"], 10).max(1) as usize,
            content_preview_chars: get_u64(config, &["retrieval", "content_preview_chars"], 500)
                as usize,
        }
    }

    fn format_results(&self, results: &[ScoredChunk]) -> String {
        let mut sections = Vec::with_capacity(results.len());

        for (index, result) in results.iter().enumerate() {
            let chunk = &result.chunk;
            let mut lines = vec![format!(
                "[{}] {} (p.{}) score={:.3}",
                index + 1,
                chunk.source,
                chunk.page,
                result.score
            )];

            for (label, value) in [
                ("Composition", &chunk.composition),
                ("Process", &chunk.process),
                ("Property", &chunk.property),
            ] {
                if value != CPP_UNKNOWN {
                    lines.push(format!(
                        "{}: {}",
                        label,
                        truncate_chars(value, METADATA_PREVIEW_CHARS)
                    ));
                }
            }

            lines.push(format!(
                "Content: {}",
                truncate_chars(&chunk.content, self.content_preview_chars)
            ));
            sections.push(lines.join("\n"));
        }

        sections.join("\n\n")
    }
}

#[async_trait]
impl Tool for VectorSearchTool {
    fn name(&self) -> &str {
        "vectordb_search"
    }

    fn description(&self) -> &str {
        "Search the local database of ingested materials-science papers for experimental data \
         (compositions, processes, properties). Input: a natural-language query."
    }

    async fn call(&self, input: &str) -> Result<String, AppError> {
        let query = input.trim();
        if query.is_empty() {
            return Ok("Error: empty query. Provide a search phrase.".to_string());
        }

        let embeddings = self.provider.embed(&[query.to_string()]).await?;
        let query_embedding = embeddings
            .first()
            .ok_or_else(|| AppError::Internal("Embedding provider returned no vector".to_string()))?;

        let results = self.store.search(query_embedding, self.top_k).await?;
        if results.is_empty() {
            return Ok(
                "No relevant documents found in the vector database. Ingest papers first or try \
                 another tool."
                    .to_string(),
            );
        }

        Ok(self.format_results(&results))
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn truncate_cuts_long_text_with_ellipsis() {
        let long = "a".repeat(20);
        let cut = truncate_chars(&long, 10);
        assert_eq!(cut, format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn truncate_is_char_based_not_byte_based() {
        let text = "저항률".repeat(10);
        let cut = truncate_chars(&text, 5);
        assert!(cut.starts_with("저항률저항"));
    }
}
