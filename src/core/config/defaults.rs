use serde_json::{json, Value};

/// Baseline configuration used when `config.yml` is missing keys.
///
/// Chunk sizes are measured in characters; 3200 chars with a 400 char
/// overlap tracks the original 800/100 token windows.
pub fn default_config() -> Value {
    json!({
        "llm": {
            "model": "gemini-2.5-flash",
            "embedding_model": "gemini-embedding-001",
            "temperature": 0.0,
            "max_output_tokens": 2048,
        },
        "ingest": {
            "chunk_size_chars": 3200,
            "chunk_overlap_chars": 400,
            "extract_cpp": true,
            "embed_batch_size": 16,
        },
        "retrieval": {
            "top_k": 10,
            "content_preview_chars": 500,
        },
        "agent": {
            "max_iterations": 10,
            "timeout_secs": 120,
        },
        "tools": {
            "materials_project_timeout_secs": 30,
            "crossref_timeout_secs": 30,
            "crossref_rows": 5,
            "crossref_mailto": "your.email@example.com",
            "web_search_max_results": 5,
            "web_search_timeout_secs": 10,
        },
        "server": {
            "host": "127.0.0.1",
            "port": 8080,
            "allowed_origins": [],
        },
    })
}
