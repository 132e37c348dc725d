use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::AppError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool, AppError>;

    /// chat completion
    async fn chat(&self, request: ChatRequest) -> Result<String, AppError>;

    /// generate embeddings for a batch of texts
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}
