//! Integration tests for configuration loading
//!
//! These tests validate that configuration files and `CREDSYNC_*`
//! environment variables are layered correctly and validated eagerly.

use credsync::config::{ObservabilityConfig, ProviderConfig};
use credsync::observability::init_logging;
use credsync::secrets::{DescriptionTransformation, NameTransformation};
use credsync::{CredentialsError, Result};
use std::env;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ENV_KEYS: &[&str] = &["CREDSYNC_CACHE__TTL_SECONDS", "CREDSYNC_CACHE__ENABLED", "CREDSYNC_PAGE_SIZE"];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

fn config_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_without_file_or_env() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let config = ProviderConfig::from_env()?;
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl(), Duration::from_secs(300));
    assert!(config.filters.is_empty());
    assert!(config.page_size.is_none());
    Ok(())
}

#[test]
fn test_toml_file_loading() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
page_size = 25

[cache]
ttl_seconds = 60

[[filters]]
key = "name"
values = ["prod/", "!prod/legacy"]

[tag_filter]
key = "team"
value = "infra"

[transformations]
description = "hide"

[transformations.name]
kind = "remove_prefixes"
prefixes = ["prod/", "prod/eu/"]

[[endpoints]]
name = "eu"
region = "eu-west-1"
"#,
    );

    let config = ProviderConfig::load(Some(file.path()))?;
    assert_eq!(config.page_size, Some(25));
    assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    assert_eq!(config.server_filters()?.len(), 1);
    assert_eq!(config.tag_filter().map(|f| f.value), Some("infra".to_string()));
    assert_eq!(config.transformations.description, DescriptionTransformation::Hide);
    assert_eq!(
        config.transformations.name,
        NameTransformation::RemovePrefixes { prefixes: vec!["prod/".into(), "prod/eu/".into()] }
    );
    assert_eq!(config.endpoints[0].region.as_deref(), Some("eu-west-1"));
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let file = config_file(".json", r#"{"cache": {"ttl_seconds": 60}}"#);
    env::set_var("CREDSYNC_CACHE__TTL_SECONDS", "15");
    env::set_var("CREDSYNC_CACHE__ENABLED", "true");

    let result = ProviderConfig::load(Some(file.path()));
    clear_env();

    assert_eq!(result?.cache.ttl(), Duration::from_secs(15));
    Ok(())
}

#[test]
fn test_disabled_cache_from_env() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("CREDSYNC_CACHE__ENABLED", "false");
    let result = ProviderConfig::from_env();
    clear_env();

    let ttl = result?.cache.ttl();
    assert!(!ttl.is_zero());
    assert!(ttl < Duration::from_millis(1));
    Ok(())
}

#[test]
fn test_unknown_filter_key_fails_at_load() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let file = config_file(".json", r#"{"filters": [{"key": "colour", "values": ["blue"]}]}"#);
    let err = ProviderConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, CredentialsError::Config { .. }));
    assert!(err.to_string().contains("colour"));
}

#[test]
fn test_invalid_page_size_fails_at_load() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("CREDSYNC_PAGE_SIZE", "500");
    let result = ProviderConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(CredentialsError::Config { .. })));
}

#[test]
fn test_missing_file_is_an_error() {
    let _guard = ENV_MUTEX.lock().unwrap();

    let result = ProviderConfig::load(Some(std::path::Path::new("/nonexistent/credsync.toml")));
    assert!(matches!(result, Err(CredentialsError::Config { .. })));
}

#[test]
fn test_second_logging_init_is_noop() {
    let config = ObservabilityConfig::default();
    init_logging(&config).unwrap();
    assert!(!init_logging(&config).unwrap());
}
