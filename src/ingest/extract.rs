//! LLM-based Composition-Process-Property extraction.

use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::service::get_f64;
use crate::core::errors::AppError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompts;
use crate::rag::CPP_UNKNOWN;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CppRecord {
    pub composition: String,
    pub process: String,
    pub property: String,
}

impl Default for CppRecord {
    fn default() -> Self {
        Self {
            composition: CPP_UNKNOWN.to_string(),
            process: CPP_UNKNOWN.to_string(),
            property: CPP_UNKNOWN.to_string(),
        }
    }
}

fn cpp_validator() -> &'static jsonschema::Validator {
    static VALIDATOR: OnceLock<jsonschema::Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let schema = json!({
            "type": "object",
            "properties": {
                "composition": { "type": "string" },
                "process": { "type": "string" },
                "property": { "type": "string" },
            },
            "required": ["composition", "process", "property"],
        });
        jsonschema::validator_for(&schema).expect("static schema is valid")
    })
}

/// Result of one extraction attempt. `degraded` marks chunks where the
/// LLM call or parse failed and the defaults were substituted; an
/// all-"N/A" answer the model actually gave is not degraded.
#[derive(Debug, Clone)]
pub struct CppExtraction {
    pub record: CppRecord,
    pub degraded: bool,
}

/// Extracts C-P-P records from chunk text. Extraction never fails the
/// pipeline: any LLM or parse problem degrades to "N/A" fields.
pub struct CppExtractor {
    provider: Arc<dyn LlmProvider>,
    temperature: f64,
}

impl CppExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &Value) -> Self {
        Self {
            provider,
            temperature: get_f64(config, &["llm", "temperature"], 0.0),
        }
    }

    pub async fn extract(&self, text: &str) -> CppExtraction {
        match self.try_extract(text).await {
            Ok(record) => CppExtraction {
                record,
                degraded: false,
            },
            Err(err) => {
                tracing::warn!("C-P-P extraction failed, using defaults: {}", err);
                CppExtraction {
                    record: CppRecord::default(),
                    degraded: true,
                }
            }
        }
    }

    async fn try_extract(&self, text: &str) -> Result<CppRecord, AppError> {
        let prompt = prompts::cpp_extraction_prompt(text);
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(self.temperature),
            max_output_tokens: None,
            stop: None,
        };

        let response = self.provider.chat(request).await?;
        parse_cpp_response(&response)
            .ok_or_else(|| AppError::Internal("No valid C-P-P JSON in LLM response".to_string()))
    }
}

/// Scan the LLM response for a JSON object matching the C-P-P schema.
///
/// Models wrap JSON in code fences or prose more often than not, so this
/// accepts the first brace-delimited object that validates.
pub fn parse_cpp_response(text: &str) -> Option<CppRecord> {
    let value = extract_json_object(text)?;
    if !cpp_validator().is_valid(&value) {
        return None;
    }

    let record: CppRecord = serde_json::from_value(value).ok()?;
    Some(normalize(record))
}

fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn normalize(record: CppRecord) -> CppRecord {
    let clean = |field: String| {
        let trimmed = field.trim().to_string();
        if trimmed.is_empty() {
            CPP_UNKNOWN.to_string()
        } else {
            trimmed
        }
    };

    CppRecord {
        composition: clean(record.composition),
        process: clean(record.process),
        property: clean(record.property),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct OneReplyProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for OneReplyProvider {
        fn name(&self) -> &str {
            "one-reply"
        }

        async fn health_check(&self) -> Result<bool, AppError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, AppError> {
            Ok(self.reply.clone())
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            Ok(inputs.iter().map(|_| vec![0.0]).collect())
        }
    }

    fn extractor(reply: &str) -> CppExtractor {
        CppExtractor::new(
            Arc::new(OneReplyProvider {
                reply: reply.to_string(),
            }),
            &json!({}),
        )
    }

    #[tokio::test]
    async fn all_unknown_answer_is_not_degraded() {
        let extraction = extractor(
            r#"{"composition": "N/A", "process": "N/A", "property": "N/A"}"#,
        )
        .extract("chunk with no data")
        .await;

        assert!(!extraction.degraded);
        assert_eq!(extraction.record, CppRecord::default());
    }

    #[tokio::test]
    async fn unparseable_reply_is_degraded() {
        let extraction = extractor("I cannot produce JSON today.")
            .extract("chunk")
            .await;

        assert!(extraction.degraded);
        assert_eq!(extraction.record, CppRecord::default());
    }

    #[test]
    fn parses_bare_json() {
        let record = parse_cpp_response(
            r#"{"composition": "Cu, Mg", "process": "sputtering", "property": "low resistivity"}"#,
        )
        .unwrap();
        assert_eq!(record.composition, "Cu, Mg");
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let text = "Here is the result:\n```json\n{\"composition\": \"Cu\", \"process\": \"PVD\", \"property\": \"N/A\"}\n```\nDone.";
        let record = parse_cpp_response(text).unwrap();
        assert_eq!(record.process, "PVD");
        assert_eq!(record.property, "N/A");
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_cpp_response(r#"{"composition": "Cu"}"#).is_none());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(parse_cpp_response(
            r#"{"composition": "Cu", "process": 42, "property": "x"}"#
        )
        .is_none());
    }

    #[test]
    fn rejects_non_json_text() {
        assert!(parse_cpp_response("I could not find any data.").is_none());
    }

    #[test]
    fn empty_fields_become_unknown() {
        let record = parse_cpp_response(
            r#"{"composition": "  ", "process": "anneal", "property": ""}"#,
        )
        .unwrap();
        assert_eq!(record.composition, CPP_UNKNOWN);
        assert_eq!(record.process, "anneal");
        assert_eq!(record.property, CPP_UNKNOWN);
    }
}
