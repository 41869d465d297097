//! # Configuration Settings
//!
//! Defines the configuration structure for a credential provider.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use validator::Validate;

use crate::errors::{CredentialsError, Result};
use crate::secrets::{DescriptionTransformation, Filter, NameTransformation, TagFilter};

/// TTL used when caching is disabled. Zero is not a valid TTL.
pub const DISABLED_CACHE_TTL: Duration = Duration::from_nanos(1);

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Cache configuration
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Server-side listing filters
    #[validate(nested)]
    pub filters: Vec<FilterConfig>,

    /// Client-side exact tag match
    #[validate(nested)]
    pub tag_filter: Option<TagFilterConfig>,

    /// Id and description rewriting
    pub transformations: TransformationsConfig,

    /// Secondary stores, each resolved and cached independently
    #[validate(nested)]
    pub endpoints: Vec<EndpointConfig>,

    /// Requested listing page size
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub page_size: Option<u32>,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl ProviderConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(CredentialsError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator crate cannot express.
    fn validate_custom(&self) -> Result<()> {
        self.server_filters()?;

        match &self.transformations.name {
            NameTransformation::RemovePrefix { prefix } if prefix.is_empty() => {
                return Err(CredentialsError::config("remove_prefix needs a non-empty prefix"));
            }
            NameTransformation::RemovePrefixes { prefixes }
                if prefixes.is_empty() || prefixes.iter().any(String::is_empty) =>
            {
                return Err(CredentialsError::config(
                    "remove_prefixes needs at least one prefix and no empty prefixes",
                ));
            }
            _ => {}
        }

        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if !names.insert(endpoint.name.as_str()) {
                return Err(CredentialsError::config(format!(
                    "Endpoint '{}' is configured more than once",
                    endpoint.name
                )));
            }
        }

        Ok(())
    }

    /// Parses the configured server-side filters.
    pub fn server_filters(&self) -> Result<Vec<Filter>> {
        self.filters.iter().map(|f| Filter::new(&f.key, f.values.iter().cloned())).collect()
    }

    pub fn tag_filter(&self) -> Option<TagFilter> {
        self.tag_filter.as_ref().map(|f| TagFilter::new(&f.key, &f.value))
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache resolved credentials
    pub enabled: bool,

    /// Freshness window in seconds
    #[validate(range(min = 1, message = "Cache TTL must be at least 1 second"))]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, ttl_seconds: 300 }
    }
}

impl CacheConfig {
    /// Effective TTL. A disabled cache gets [`DISABLED_CACHE_TTL`].
    pub fn ttl(&self) -> Duration {
        if self.enabled {
            Duration::from_secs(self.ttl_seconds)
        } else {
            DISABLED_CACHE_TTL
        }
    }
}

/// Server-side filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    /// Filter key (name, description, tag-key, tag-value, primary-region, owning-service, all)
    #[validate(length(min = 1, message = "Filter key cannot be empty"))]
    pub key: String,

    /// Prefix values; a leading `!` negates
    #[validate(length(min = 1, message = "Filter needs at least one value"))]
    pub values: Vec<String>,
}

/// Client-side tag filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TagFilterConfig {
    #[validate(length(min = 1, message = "Tag filter key cannot be empty"))]
    pub key: String,

    pub value: String,
}

/// Id and description rewriting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationsConfig {
    pub name: NameTransformation,
    pub description: DescriptionTransformation,
}

/// Secondary store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EndpointConfig {
    /// Source name used in logs
    #[validate(length(min = 1, message = "Endpoint name cannot be empty"))]
    pub name: String,

    /// Region of the endpoint, if the store is regional
    #[serde(default)]
    pub region: Option<String>,

    /// Store-specific location (fixture file, Vault path)
    #[serde(default)]
    pub location: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}
