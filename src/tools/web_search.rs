//! Brave web search, the agent's last-resort tool.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Tool;
use crate::core::config::service::{get_str, get_u64};
use crate::core::errors::AppError;

const API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

const SNIPPET_PREVIEW_CHARS: usize = 200;

pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(config: &Value) -> Self {
        let timeout = get_u64(config, &["tools", "web_search_timeout_secs"], 10);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: API_URL.to_string(),
            api_key: get_str(config, &["secrets", "brave_api_key"])
                .map(|s| s.to_string())
                .filter(|s| !s.trim().is_empty()),
            max_results: get_u64(config, &["tools", "web_search_max_results"], 5).clamp(1, 20)
                as usize,
        }
    }

    async fn fetch_results(&self, query: &str, api_key: &str) -> Result<Value, AppError> {
        let url = format!(
            "{}?q={}&count={}",
            self.base_url,
            urlencoding::encode(query),
            self.max_results
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await
            .map_err(|err| AppError::Unavailable(format!("Web search request failed: {}", err)))?;

        let status = response.status();
        match status.as_u16() {
            401 => {
                return Err(AppError::Unavailable(
                    "Web search rejected the API key (HTTP 401). Check BRAVE_API_KEY.".to_string(),
                ))
            }
            429 => {
                return Err(AppError::Unavailable(
                    "Web search rate limit exceeded (HTTP 429). Retry later or use another tool."
                        .to_string(),
                ))
            }
            _ if !status.is_success() => {
                return Err(AppError::Unavailable(format!(
                    "Web search returned HTTP {}",
                    status
                )))
            }
            _ => {}
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| AppError::Internal(format!("Invalid web search response: {}", err)))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "General web search for news and industry information. Use as a last resort; results \
         may be outdated or unreliable. Input: search keywords."
    }

    async fn call(&self, input: &str) -> Result<String, AppError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(
                "Web search API key is not configured. Set BRAVE_API_KEY or add \
                 secrets.brave_api_key to secrets.yml."
                    .to_string(),
            );
        };

        let query = input.trim();
        if query.is_empty() {
            return Ok("Error: empty query. Provide search keywords.".to_string());
        }

        let body = self.fetch_results(query, api_key).await?;
        Ok(format_results(query, &body, self.max_results))
    }
}

pub fn format_results(query: &str, body: &Value, max_results: usize) -> String {
    let empty = Vec::new();
    let results = body
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|r| r.as_array())
        .unwrap_or(&empty);

    if results.is_empty() {
        return format!("No web results for '{}'.", query);
    }

    let mut sections = Vec::new();
    for (index, result) in results.iter().take(max_results).enumerate() {
        let title = result
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("(untitled)");
        let mut lines = vec![format!("[{}] {}", index + 1, title)];

        if let Some(url) = result.get("url").and_then(|u| u.as_str()) {
            lines.push(format!("URL: {}", url));
        }
        if let Some(description) = result.get("description").and_then(|d| d.as_str()) {
            lines.push(format!(
                "Snippet: {}",
                truncate_chars(description, SNIPPET_PREVIEW_CHARS)
            ));
        }

        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
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
    use serde_json::json;

    #[test]
    fn formats_title_url_and_snippet() {
        let body = json!({
            "web": {
                "results": [
                    {
                        "title": "Copper interconnect trends",
                        "url": "https://example.com/cu",
                        "description": "An overview of interconnect metallization.",
                    }
                ]
            }
        });

        let text = format_results("copper", &body, 5);
        assert!(text.contains("[1] Copper interconnect trends"));
        assert!(text.contains("URL: https://example.com/cu"));
        assert!(text.contains("Snippet: An overview"));
    }

    #[test]
    fn truncates_long_snippets() {
        let body = json!({
            "web": { "results": [{ "title": "t", "description": "x".repeat(500) }] }
        });

        let text = format_results("q", &body, 5);
        assert!(text.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn caps_result_count() {
        let results: Vec<Value> = (0..10).map(|i| json!({ "title": format!("r{}", i) })).collect();
        let body = json!({ "web": { "results": results } });

        let text = format_results("q", &body, 3);
        assert!(text.contains("[3] r2"));
        assert!(!text.contains("r3"));
    }

    #[test]
    fn empty_results_give_guidance() {
        let text = format_results("q", &json!({}), 5);
        assert!(text.contains("No web results"));
    }
}
