//! Router assembly and the HTTP entry point.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::core::config::service::{get_str, get_u64};
use crate::core::errors::AppError;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/chat", post(handlers::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// An empty `server.allowed_origins` list opens CORS up for local
/// development; a non-empty list is enforced as-is.
fn cors_layer(config: &serde_json::Value) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .get("server")
        .and_then(|s| s.get("allowed_origins"))
        .and_then(|o| o.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub async fn serve(state: Arc<AppState>, port_override: Option<u16>) -> Result<(), AppError> {
    let host = get_str(&state.config, &["server", "host"])
        .unwrap_or("127.0.0.1")
        .to_string();
    let port = port_override
        .unwrap_or_else(|| get_u64(&state.config, &["server", "port"], 8080) as u16);

    let app = build_router(state);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Internal(format!("Failed to bind {}: {}", addr, err)))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.map_err(AppError::internal)
}
