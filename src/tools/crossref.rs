//! Crossref works search for recent academic literature.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::Tool;
use crate::core::config::service::{get_str, get_u64};
use crate::core::errors::AppError;

const API_BASE: &str = "https://api.crossref.org";

const ABSTRACT_PREVIEW_CHARS: usize = 300;
const MAX_LISTED_AUTHORS: usize = 3;

pub struct CrossrefSearchTool {
    client: reqwest::Client,
    base_url: String,
    rows: u64,
    mailto: Option<String>,
}

impl CrossrefSearchTool {
    pub fn new(config: &Value) -> Self {
        let timeout = get_u64(config, &["tools", "crossref_timeout_secs"], 30);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: API_BASE.to_string(),
            rows: get_u64(config, &["tools", "crossref_rows"], 5).clamp(1, 20),
            mailto: get_str(config, &["tools", "crossref_mailto"])
                .map(|s| s.to_string())
                .filter(|s| !s.trim().is_empty()),
        }
    }

    async fn fetch_works(&self, query: &str) -> Result<Value, AppError> {
        let mut url = format!(
            "{}/works?query={}&rows={}&sort=relevance&order=desc",
            self.base_url,
            urlencoding::encode(query),
            self.rows
        );
        if let Some(mailto) = &self.mailto {
            url.push_str(&format!("&mailto={}", urlencoding::encode(mailto)));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| AppError::Unavailable(format!("Crossref request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Unavailable(format!(
                "Crossref returned HTTP {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| AppError::Internal(format!("Invalid Crossref response: {}", err)))
    }
}

#[async_trait]
impl Tool for CrossrefSearchTool {
    fn name(&self) -> &str {
        "crossref_search"
    }

    fn description(&self) -> &str {
        "Search Crossref for academic publications (titles, authors, DOIs, abstracts). \
         English-only index; translate non-English queries first. Input: search keywords."
    }

    async fn call(&self, input: &str) -> Result<String, AppError> {
        let query = input.trim();
        if query.is_empty() {
            return Ok("Error: empty query. Provide search keywords.".to_string());
        }

        let body = self.fetch_works(query).await?;
        Ok(format_works(query, &body))
    }
}

pub fn format_works(query: &str, body: &Value) -> String {
    let empty = Vec::new();
    let items = body
        .get("message")
        .and_then(|m| m.get("items"))
        .and_then(|i| i.as_array())
        .unwrap_or(&empty);

    if items.is_empty() {
        return format!("No Crossref results for '{}'. Try broader keywords.", query);
    }

    let mut sections = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let title = first_string(item, "title").unwrap_or_else(|| "(untitled)".to_string());
        let mut lines = vec![format!("[{}] {}", index + 1, title)];

        if let Some(authors) = format_authors(item) {
            lines.push(format!("Authors: {}", authors));
        }
        if let Some(journal) = first_string(item, "container-title") {
            lines.push(format!("Journal: {}", journal));
        }
        if let Some(year) = published_year(item) {
            lines.push(format!("Year: {}", year));
        }
        if let Some(doi) = item.get("DOI").and_then(|d| d.as_str()) {
            lines.push(format!("DOI: https://doi.org/{}", doi));
        }
        if let Some(summary) = item.get("abstract").and_then(|a| a.as_str()) {
            let cleaned = strip_jats_markup(summary);
            if !cleaned.is_empty() {
                lines.push(format!(
                    "Abstract: {}",
                    truncate_chars(&cleaned, ABSTRACT_PREVIEW_CHARS)
                ));
            }
        }

        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn first_string(item: &Value, key: &str) -> Option<String> {
    item.get(key)?
        .as_array()?
        .first()?
        .as_str()
        .map(|s| s.to_string())
}

fn format_authors(item: &Value) -> Option<String> {
    let authors = item.get("author")?.as_array()?;
    if authors.is_empty() {
        return None;
    }

    let mut names: Vec<String> = authors
        .iter()
        .take(MAX_LISTED_AUTHORS)
        .filter_map(|author| {
            let family = author.get("family").and_then(|f| f.as_str())?;
            match author.get("given").and_then(|g| g.as_str()) {
                Some(given) => Some(format!("{} {}", given, family)),
                None => Some(family.to_string()),
            }
        })
        .collect();

    if names.is_empty() {
        return None;
    }
    if authors.len() > MAX_LISTED_AUTHORS {
        names.push("et al.".to_string());
    }
    Some(names.join(", "))
}

fn published_year(item: &Value) -> Option<i64> {
    for key in ["published", "published-print", "published-online"] {
        if let Some(year) = item
            .get(key)
            .and_then(|p| p.get("date-parts"))
            .and_then(|d| d.as_array())
            .and_then(|parts| parts.first())
            .and_then(|first| first.as_array())
            .and_then(|first| first.first())
            .and_then(|y| y.as_i64())
        {
            return Some(year);
        }
    }
    None
}

/// Crossref abstracts arrive as JATS XML fragments.
fn strip_jats_markup(text: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("static regex"));
    let stripped = tag.replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
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

    fn sample_item() -> Value {
        json!({
            "title": ["Electromigration in Cu-Mg interconnects"],
            "container-title": ["Journal of Applied Physics"],
            "DOI": "10.1000/test.doi",
            "published": { "date-parts": [[2023, 5]] },
            "author": [
                { "given": "A", "family": "Kim" },
                { "given": "B", "family": "Lee" },
                { "given": "C", "family": "Park" },
                { "given": "D", "family": "Choi" },
            ],
            "abstract": "<jats:p>We study <jats:italic>Cu-Mg</jats:italic> alloys.</jats:p>",
        })
    }

    #[test]
    fn formats_title_authors_and_doi() {
        let body = json!({ "message": { "items": [sample_item()] } });
        let text = format_works("cu mg", &body);

        assert!(text.contains("[1] Electromigration in Cu-Mg interconnects"));
        assert!(text.contains("Authors: A Kim, B Lee, C Park, et al."));
        assert!(text.contains("DOI: https://doi.org/10.1000/test.doi"));
        assert!(text.contains("Year: 2023"));
    }

    #[test]
    fn strips_jats_tags_from_abstract() {
        let body = json!({ "message": { "items": [sample_item()] } });
        let text = format_works("cu mg", &body);

        assert!(text.contains("Abstract: We study Cu-Mg alloys."));
        assert!(!text.contains("jats:"));
    }

    #[test]
    fn empty_results_give_guidance() {
        let body = json!({ "message": { "items": [] } });
        let text = format_works("nothing", &body);
        assert!(text.contains("No Crossref results"));
    }

    #[test]
    fn missing_fields_are_skipped() {
        let body = json!({ "message": { "items": [{ "DOI": "10.1/x" }] } });
        let text = format_works("q", &body);
        assert!(text.contains("(untitled)"));
        assert!(!text.contains("Authors:"));
    }
}
