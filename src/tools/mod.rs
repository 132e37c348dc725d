//! Agent tools and the registry that dispatches to them.

pub mod crossref;
pub mod materials_project;
pub mod vector_search;
pub mod web_search;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::AppError;

pub use crossref::CrossrefSearchTool;
pub use materials_project::MaterialsProjectTool;
pub use vector_search::VectorSearchTool;
pub use web_search::WebSearchTool;

/// A capability the agent can invoke by name with a plain-text input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description shown to the model in the system prompt.
    fn description(&self) -> &str;

    async fn call(&self, input: &str) -> Result<String, AppError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// "name: description" lines for prompt rendering.
    pub fn descriptions_block(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a tool and always produce observation text: unknown tools and
    /// tool errors become messages the model can react to instead of
    /// aborting the agent loop.
    pub async fn dispatch(&self, name: &str, input: &str) -> String {
        let Some(tool) = self.get(name) else {
            return format!(
                "Error: unknown tool '{}'. Available tools: {}",
                name,
                self.names().join(", ")
            );
        };

        match tool.call(input).await {
            Ok(observation) => observation,
            Err(err) => {
                tracing::warn!("Tool '{}' failed: {}", name, err);
                format!("Error: tool '{}' failed: {}", name, err)
            }
        }
    }
}
