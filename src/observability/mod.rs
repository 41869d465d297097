//! # Observability
//!
//! Structured logging through `tracing`. Secret payloads never reach the log:
//! every secret type redacts itself in `Debug` and `Display`.

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{ObservabilityConfig, ProviderConfig};
use crate::errors::{CredentialsError, Result};

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns `Ok(false)` when a
/// subscriber was already installed (e.g. by a test harness).
pub fn init_logging(config: &ObservabilityConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            CredentialsError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init().is_ok()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init().is_ok()
    };
    Ok(installed)
}

/// Logs the effective configuration, without secrets.
pub fn log_config_info(config: &ProviderConfig) {
    info!(
        cache_enabled = config.cache.enabled,
        cache_ttl_ms = config.cache.ttl().as_millis() as u64,
        filters = config.filters.len(),
        tag_filter = config.tag_filter.is_some(),
        name_transformation = ?config.transformations.name,
        description = ?config.transformations.description,
        endpoints = config.endpoints.len(),
        page_size = ?config.page_size,
        "Credential provider configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ObservabilityConfig { log_level: "credsync=loud".to_string(), json_logs: false };
        assert!(matches!(init_logging(&config), Err(CredentialsError::Config { .. })));
    }

    #[test]
    fn test_log_config_info() {
        // This should not panic
        log_config_info(&ProviderConfig::default());
    }
}
