use serde_json::{Map, Value};

use crate::core::errors::AppError;

pub fn validate_config(config: &Value) -> Result<(), AppError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_output_tokens", "max_output_tokens", 1, 65_536)?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_size_chars", "chunk_size_chars", 1, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.chunk_overlap_chars",
            "chunk_overlap_chars",
            0,
            1_000_000,
        )?;
        validate_bool_field(ingest, "ingest.extract_cpp", "extract_cpp")?;
        validate_u64_field(ingest, "ingest.embed_batch_size", "embed_batch_size", 1, 1_000)?;

        let size = ingest
            .get("chunk_size_chars")
            .and_then(|v| v.as_u64())
            .unwrap_or(3200);
        let overlap = ingest
            .get("chunk_overlap_chars")
            .and_then(|v| v.as_u64())
            .unwrap_or(400);
        if overlap >= size {
            return Err(AppError::BadRequest(format!(
                "Invalid config at 'ingest.chunk_overlap_chars': overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.content_preview_chars",
            "content_preview_chars",
            1,
            1_000_000,
        )?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_u64_field(agent, "agent.max_iterations", "max_iterations", 1, 50)?;
        validate_u64_field(agent, "agent.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(tools) = expect_optional_object(root, "tools")? {
        validate_u64_field(
            tools,
            "tools.materials_project_timeout_secs",
            "materials_project_timeout_secs",
            1,
            86_400,
        )?;
        validate_u64_field(
            tools,
            "tools.crossref_timeout_secs",
            "crossref_timeout_secs",
            1,
            86_400,
        )?;
        validate_u64_field(tools, "tools.crossref_rows", "crossref_rows", 1, 100)?;
        validate_optional_string_field(tools, "tools.crossref_mailto", "crossref_mailto")?;
        validate_u64_field(
            tools,
            "tools.web_search_max_results",
            "web_search_max_results",
            1,
            50,
        )?;
        validate_u64_field(
            tools,
            "tools.web_search_timeout_secs",
            "web_search_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_string_array_field(server, "server.allowed_origins", "allowed_origins")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, AppError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(AppError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(AppError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        if item.as_str().is_none() {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> AppError {
    AppError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_defaults() {
        let config = crate::core::config::defaults::default_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_overlap_larger_than_chunk() {
        let config = json!({
            "ingest": { "chunk_size_chars": 100, "chunk_overlap_chars": 100 }
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_wrong_types() {
        let config = json!({ "retrieval": { "top_k": "ten" } });
        assert!(validate_config(&config).is_err());

        let config = json!({ "llm": { "temperature": 5.0 } });
        assert!(validate_config(&config).is_err());
    }
}
