//! Shared application state wired once at startup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::agent::AgentExecutor;
use crate::core::config::{AppPaths, ConfigService};
use crate::core::errors::AppError;
use crate::ingest::IngestPipeline;
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::{RagStore, SqliteRagStore};
use crate::tools::{
    CrossrefSearchTool, MaterialsProjectTool, ToolRegistry, VectorSearchTool, WebSearchTool,
};

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Value,
    pub model_name: String,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn RagStore>,
    pub tools: Arc<ToolRegistry>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Load config, open the store, and register the four agent tools.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, AppError> {
        let config = ConfigService::new(paths.clone()).load_config()?;

        let provider = GeminiProvider::from_config(&config)?;
        let model_name = provider.model().to_string();
        let llm: Arc<dyn LlmProvider> = Arc::new(provider);

        let store: Arc<dyn RagStore> = Arc::new(SqliteRagStore::new(&paths).await?);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(VectorSearchTool::new(
            llm.clone(),
            store.clone(),
            &config,
        )));
        registry.register(Arc::new(MaterialsProjectTool::new(&config)));
        registry.register(Arc::new(CrossrefSearchTool::new(&config)));
        registry.register(Arc::new(WebSearchTool::new(&config)));

        tracing::info!(
            "Initialized: model={}, tools=[{}]",
            model_name,
            registry.names().join(", ")
        );

        Ok(Arc::new(Self {
            paths,
            config,
            model_name,
            llm,
            store,
            tools: Arc::new(registry),
            started_at: Utc::now(),
        }))
    }

    pub fn agent(&self) -> AgentExecutor {
        AgentExecutor::new(self.llm.clone(), self.tools.clone(), &self.config)
    }

    pub fn ingest_pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.llm.clone(), self.store.clone(), &self.config)
    }
}
