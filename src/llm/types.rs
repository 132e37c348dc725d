use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_output_tokens: None,
            stop: None,
        }
    }

    pub fn with_settings(mut self, config: &serde_json::Value) -> Self {
        let llm = config.get("llm");
        self.temperature = llm
            .and_then(|v| v.get("temperature"))
            .and_then(|v| v.as_f64())
            .or(self.temperature);
        self.max_output_tokens = llm
            .and_then(|v| v.get("max_output_tokens"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .or(self.max_output_tokens);
        self
    }
}
