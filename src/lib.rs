pub mod config;
pub mod db;
pub mod delivery;
pub mod errors;
pub mod factory;
pub mod migration;
pub mod models;
pub mod redaction;
pub mod report;
pub mod server;
pub mod service;
pub mod store;
pub mod validation;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, AppResult};
pub use crate::service::AuditService;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// JSON logs to a daily rolling `audit.log`. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(log_dir: &Path, default_filter: &str) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "audit.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
