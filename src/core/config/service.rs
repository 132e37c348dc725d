use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::AppError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "max_output_tokens", "tokens"];

/// Environment variables that override the corresponding config paths.
const ENV_OVERRIDES: [(&str, &[&str]); 4] = [
    ("GOOGLE_API_KEY", &["secrets", "google_api_key"]),
    (
        "MATERIALS_PROJECT_API_KEY",
        &["secrets", "materials_project_api_key"],
    ),
    ("BRAVE_API_KEY", &["secrets", "brave_api_key"]),
    ("CROSSREF_MAILTO", &["tools", "crossref_mailto"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("AGENTIC_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Defaults, then `config.yml`, then `secrets.yml`, then environment
    /// variables; later layers win.
    pub fn load_config(&self) -> Result<Value, AppError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());

        let mut merged = deep_merge(&default_config(), &public_config);
        merged = deep_merge(&merged, &secrets_config);
        apply_env_overrides(&mut merged);

        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn apply_env_overrides(config: &mut Value) {
    for (var, path) in ENV_OVERRIDES {
        let Ok(value) = env::var(var) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        set_path(config, path, Value::String(value));
    }
}

fn set_path(config: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for key in parents {
        let Some(obj) = current.as_object_mut() else {
            return;
        };
        current = obj
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if let Some(obj) = current.as_object_mut() {
        obj.insert(last.to_string(), value);
    }
}

pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    if SENSITIVE_WHITELIST.iter().any(|allow| lowered == *allow) {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, entry) in map {
                if is_sensitive_key(key) && entry.is_string() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(entry));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        other => other.clone(),
    }
}

/// Convenience accessors used across modules.
pub fn get_str<'a>(config: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(config, path).and_then(|v| v.as_str())
}

pub fn get_u64(config: &Value, path: &[&str], fallback: u64) -> u64 {
    get_path(config, path)
        .and_then(|v| v.as_u64())
        .unwrap_or(fallback)
}

pub fn get_f64(config: &Value, path: &[&str], fallback: f64) -> f64 {
    get_path(config, path)
        .and_then(|v| v.as_f64())
        .unwrap_or(fallback)
}

pub fn get_bool(config: &Value, path: &[&str], fallback: bool) -> bool {
    get_path(config, path)
        .and_then(|v| v.as_bool())
        .unwrap_or(fallback)
}

fn get_path<'a>(config: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = config;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_prefers_overlay_scalars() {
        let base = json!({ "llm": { "model": "a", "temperature": 0.0 } });
        let overlay = json!({ "llm": { "model": "b" } });
        let merged = deep_merge(&base, &overlay);

        assert_eq!(get_str(&merged, &["llm", "model"]), Some("b"));
        assert_eq!(get_f64(&merged, &["llm", "temperature"], 1.0), 0.0);
    }

    #[test]
    fn redaction_masks_keys_but_not_token_counts() {
        let config = json!({
            "secrets": { "google_api_key": "abc123" },
            "llm": { "max_output_tokens": 2048 },
        });
        let redacted = redact_sensitive_values(&config);

        assert_eq!(
            get_str(&redacted, &["secrets", "google_api_key"]),
            Some(REDACT_PLACEHOLDER)
        );
        assert_eq!(get_u64(&redacted, &["llm", "max_output_tokens"], 0), 2048);
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut config = json!({});
        set_path(&mut config, &["secrets", "brave_api_key"], json!("k"));
        assert_eq!(get_str(&config, &["secrets", "brave_api_key"]), Some("k"));
    }

    #[test]
    fn load_config_layers_defaults_file_secrets_and_env() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "llm:\n  model: from-file\nretrieval:\n  top_k: 7\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("secrets.yml"),
            "llm:\n  model: from-secrets\nsecrets:\n  brave_api_key: file-secret\n",
        )
        .unwrap();

        env::set_var("AGENTIC_RAG_CONFIG_PATH", dir.path().join("config.yml"));
        env::set_var("AGENTIC_RAG_DATA_DIR", dir.path());
        env::set_var("CROSSREF_MAILTO", "env@example.com");
        env::remove_var("BRAVE_API_KEY");

        let service = ConfigService::new(Arc::new(AppPaths::new()));
        let config = service.load_config();

        env::remove_var("AGENTIC_RAG_CONFIG_PATH");
        env::remove_var("AGENTIC_RAG_DATA_DIR");
        env::remove_var("CROSSREF_MAILTO");

        let config = config.unwrap();
        // later layers win: secrets.yml over config.yml over defaults
        assert_eq!(get_str(&config, &["llm", "model"]), Some("from-secrets"));
        assert_eq!(get_u64(&config, &["retrieval", "top_k"], 0), 7);
        assert_eq!(
            get_str(&config, &["secrets", "brave_api_key"]),
            Some("file-secret")
        );
        // env overlays beat every file layer
        assert_eq!(
            get_str(&config, &["tools", "crossref_mailto"]),
            Some("env@example.com")
        );
        // untouched keys keep their defaults
        assert_eq!(get_u64(&config, &["agent", "max_iterations"], 0), 10);
    }
}
