//! Tracing setup: stdout plus a daily-rolling file in the data directory.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

// Dropping the guard would lose buffered log lines at exit.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init(paths: &AppPaths) {
    let _ = std::fs::create_dir_all(&paths.log_dir);

    let (file_writer, guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&paths.log_dir, "agentic-rag.log"),
    );
    let _ = LOG_GUARD.set(guard);

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(default_filter())
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// RUST_LOG wins; otherwise info-level with the chattier sqlx query logs
/// turned down.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
}
