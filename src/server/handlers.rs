//! HTTP handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::AgentStep;
use crate::core::errors::AppError;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub model: String,
    pub llm_reachable: bool,
    pub chunk_count: usize,
    pub sources: Vec<String>,
    pub tools: Vec<String>,
    pub uptime_secs: i64,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let chunk_count = state.store.count().await?;
    let sources = state.store.sources().await?;
    let llm_reachable = state.llm.health_check().await.unwrap_or(false);

    Ok(Json(StatusResponse {
        model: state.model_name.clone(),
        llm_reachable,
        chunk_count,
        sources,
        tools: state.tools.names(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    }))
}

#[derive(Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub show_steps: bool,
}

#[derive(Serialize)]
pub struct ChatResponseBody {
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<AgentStep>>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, AppError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(%request_id, "chat request: {}", message);

    let outcome = state.agent().run(message).await?;
    tracing::info!(
        %request_id,
        "chat done: {} steps, {} chars",
        outcome.steps.len(),
        outcome.output.len()
    );

    Ok(Json(ChatResponseBody {
        output: outcome.output,
        steps: body.show_steps.then_some(outcome.steps),
    }))
}
