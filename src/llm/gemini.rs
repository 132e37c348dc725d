//! Google Gemini provider over the generative language REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::AppError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, embedding_model: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key, model, embedding_model)
    }

    pub fn with_base_url(
        base_url: String,
        api_key: String,
        model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            embedding_model,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Value) -> Result<Self, AppError> {
        let api_key = config
            .get("secrets")
            .and_then(|v| v.get("google_api_key"))
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "Google API key is not set. Add GOOGLE_API_KEY to the environment or \
                     secrets.yml."
                        .to_string(),
                )
            })?
            .to_string();

        let model = config
            .get("llm")
            .and_then(|v| v.get("model"))
            .and_then(|v| v.as_str())
            .unwrap_or("gemini-2.5-flash")
            .to_string();
        let embedding_model = config
            .get("llm")
            .and_then(|v| v.get("embedding_model"))
            .and_then(|v| v.as_str())
            .unwrap_or("gemini-embedding-001")
            .to_string();

        Ok(Self::new(api_key, model, embedding_model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let res = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, AppError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = build_generate_body(&request);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Gemini chat error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(AppError::internal)?;
        parse_generate_response(&payload)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url, self.embedding_model
        );

        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(AppError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Gemini embed error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(AppError::internal)?;
        parse_embed_response(&payload, inputs.len())
    }
}

/// System messages become `systemInstruction`; assistant turns map to the
/// `model` role.
fn build_generate_body(request: &ChatRequest) -> Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in &request.messages {
        match message.role.as_str() {
            "system" => system_parts.push(json!({ "text": message.content })),
            role => {
                let mapped = if role == "assistant" { "model" } else { "user" };
                contents.push(json!({
                    "role": mapped,
                    "parts": [{ "text": message.content }],
                }));
            }
        }
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        generation_config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = request.max_output_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if let Some(stop) = &request.stop {
        generation_config.insert("stopSequences".to_string(), json!(stop));
    }

    let mut body = serde_json::Map::new();
    body.insert("contents".to_string(), Value::Array(contents));
    if !system_parts.is_empty() {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": system_parts }),
        );
    }
    if !generation_config.is_empty() {
        body.insert(
            "generationConfig".to_string(),
            Value::Object(generation_config),
        );
    }

    Value::Object(body)
}

fn parse_generate_response(payload: &Value) -> Result<String, AppError> {
    let parts = payload
        .get("candidates")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(|v| v.as_array());

    let Some(parts) = parts else {
        if let Some(block_reason) = payload
            .get("promptFeedback")
            .and_then(|v| v.get("blockReason"))
            .and_then(|v| v.as_str())
        {
            return Err(AppError::Internal(format!(
                "Gemini blocked the request: {}",
                block_reason
            )));
        }
        return Err(AppError::Internal(
            "Gemini response contained no candidates".to_string(),
        ));
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect();

    Ok(text)
}

fn parse_embed_response(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, AppError> {
    let embeddings: Vec<Vec<f32>> = payload
        .get("embeddings")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("values")
                        .and_then(|v| v.as_array())
                        .map(|vals| {
                            vals.iter()
                                .filter_map(|v| v.as_f64().map(|f| f as f32))
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    if embeddings.len() != expected {
        return Err(AppError::Internal(format!(
            "Gemini returned {} embeddings for {} inputs",
            embeddings.len(),
            expected
        )));
    }

    Ok(embeddings)
}
