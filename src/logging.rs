//! # Structured Logging Module
//!
//! Environment-aware structured logging for query compilation, condition loading
//! and registry mutations.

use crate::config::EngineConfig;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging(json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(log_level))
                .boxed()
        };

        // A host application may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            json = json,
            "Structured logging initialized"
        );
    });
}

/// Initialize logging with the output format chosen by an engine configuration
pub fn init_from_config(config: &EngineConfig) {
    init_structured_logging(config.json_logs);
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("ELEMENT_QUERY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for query lifecycle operations
pub fn log_query_operation(
    operation: &str,
    element_type: &str,
    criteria_count: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        element_type = %element_type,
        criteria_count = criteria_count,
        status = %status,
        details = details,
        "QUERY_OPERATION"
    );
}

/// Log structured data for condition tree operations
pub fn log_condition_operation(
    operation: &str,
    condition_uid: &str,
    rule_type: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        condition_uid = %condition_uid,
        rule_type = rule_type,
        status = %status,
        details = details,
        "CONDITION_OPERATION"
    );
}

/// Log structured data for registry operations
pub fn log_registry_operation(
    operation: &str,
    provider: Option<&str>,
    identifier: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        provider = provider,
        identifier = identifier,
        status = %status,
        details = details,
        "REGISTRY_OPERATION"
    );
}
