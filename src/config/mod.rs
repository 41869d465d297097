//! # Configuration Management
//!
//! Configuration is an immutable value handed to the provider at construction.
//! It can be built in code, or loaded from an optional file (TOML, YAML or
//! JSON, picked by extension) layered under `CREDSYNC_*` environment
//! variables. Nested keys use a double underscore:
//!
//! ```text
//! CREDSYNC_CACHE__TTL_SECONDS=60
//! CREDSYNC_CACHE__ENABLED=false
//! CREDSYNC_PAGE_SIZE=50
//! CREDSYNC_OBSERVABILITY__JSON_LOGS=true
//! ```

pub mod settings;

pub use settings::{
    CacheConfig, EndpointConfig, FilterConfig, ObservabilityConfig, ProviderConfig,
    TagFilterConfig, TransformationsConfig, DISABLED_CACHE_TTL,
};

use std::path::Path;
use tracing::debug;

use crate::errors::Result;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CREDSYNC";

impl ProviderConfig {
    /// Loads and validates configuration from `path` (if given) and the environment.
    ///
    /// Environment variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: ProviderConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Loads and validates configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}
