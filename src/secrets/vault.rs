//! HashiCorp Vault KV v2 secrets store.
//!
//! Keys directly under the configured path are the secrets. Custom metadata on
//! a key becomes its tags, so a secret tagged in Vault with
//! `credsync:username=joe` classifies the same way as in any other store.
//!
//! ## Secret format in Vault
//!
//! ```json
//! { "value": "<text payload>" }
//! ```
//!
//! or, for binary payloads such as PKCS#12 key stores:
//!
//! ```json
//! { "binary": "<base64 payload>" }
//! ```

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::client::{ListSecretsRequest, SecretPage, SecretSummary, SecretsStore};
use super::types::SecretValue;
use crate::credentials::Tags;
use crate::errors::{CredentialsError, Result};

/// Keys read per listing page when the request does not ask for a size.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Connection settings for a Vault KV v2 store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStoreConfig {
    /// Vault server address
    pub address: String,
    /// Vault authentication token
    #[serde(default)]
    pub token: Option<String>,
    /// Vault namespace (Enterprise)
    #[serde(default)]
    pub namespace: Option<String>,
    /// KV v2 mount path (default: "secret")
    #[serde(default = "default_mount")]
    pub mount_path: String,
    /// Directory under the mount whose keys are listed (default: the mount root)
    #[serde(default)]
    pub path: String,
}

fn default_mount() -> String {
    "secret".to_string()
}

impl VaultStoreConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            namespace: None,
            mount_path: default_mount(),
            path: String::new(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Uses:
    /// - `CREDSYNC_VAULT_ADDR` or `VAULT_ADDR`
    /// - `CREDSYNC_VAULT_TOKEN` or `VAULT_TOKEN`
    /// - `CREDSYNC_VAULT_NAMESPACE` or `VAULT_NAMESPACE`
    /// - `CREDSYNC_VAULT_MOUNT` (default: "secret")
    /// - `CREDSYNC_VAULT_PATH` (default: mount root)
    ///
    /// Returns `None` when no address is set.
    pub fn from_env() -> Option<Self> {
        let address = env_or("CREDSYNC_VAULT_ADDR", "VAULT_ADDR")?;

        Some(Self {
            address,
            token: env_or("CREDSYNC_VAULT_TOKEN", "VAULT_TOKEN"),
            namespace: env_or("CREDSYNC_VAULT_NAMESPACE", "VAULT_NAMESPACE"),
            mount_path: std::env::var("CREDSYNC_VAULT_MOUNT").unwrap_or_else(|_| default_mount()),
            path: std::env::var("CREDSYNC_VAULT_PATH").unwrap_or_default(),
        })
    }

    /// Full key path of a secret within the mount.
    fn key_path(&self, key: &str) -> String {
        let dir = self.path.trim_matches('/');
        if dir.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", dir, key)
        }
    }
}

fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary).or_else(|_| std::env::var(fallback)).ok()
}

/// Read-only store over a Vault KV v2 mount.
pub struct VaultSecretsStore {
    client: VaultClient,
    config: VaultStoreConfig,
    name: String,
}

impl std::fmt::Debug for VaultSecretsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretsStore")
            .field("name", &self.name)
            .field("mount_path", &self.config.mount_path)
            .field("path", &self.config.path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretsStore {
    pub fn new(config: VaultStoreConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            CredentialsError::config(format!("Invalid Vault store configuration: {}", e))
        })?;

        let client = VaultClient::new(settings)
            .map_err(|e| CredentialsError::config(format!("Failed to create Vault client: {}", e)))?;

        let name = format!("vault:{}/{}", config.mount_path, config.path.trim_matches('/'));
        info!(address = %config.address, store = %name, "Initialized Vault secrets store");

        Ok(Self { client, config, name })
    }

    /// Creates a store from environment configuration, if Vault is configured.
    pub fn from_env() -> Result<Option<Self>> {
        VaultStoreConfig::from_env().map(Self::new).transpose()
    }

    async fn read_summary(&self, key: &str) -> Result<Option<SecretSummary>> {
        let metadata = kv2::read_metadata(&self.client, &self.config.mount_path, &self.config.key_path(key))
            .await
            .map_err(|e| self.map_error(key, e))?;

        let current = metadata.versions.get(&metadata.current_version.to_string());
        if current.is_some_and(|v| v.destroyed || !v.deletion_time.is_empty()) {
            debug!(key = %key, "Skipping deleted Vault secret");
            return Ok(None);
        }

        let tags = metadata.custom_metadata.unwrap_or_default().into_iter().collect::<Tags>();
        Ok(Some(SecretSummary::new(key).with_tags(tags)))
    }

    fn map_error(&self, key: &str, e: ClientError) -> CredentialsError {
        match e {
            ClientError::APIError { code: 404, .. } => CredentialsError::not_found(key),
            other => {
                warn!(store = %self.name, key = %key, error = %other, "Vault request failed");
                CredentialsError::retrieval(format!("{}: {}", self.name, other))
            }
        }
    }
}

#[async_trait]
impl SecretsStore for VaultSecretsStore {
    async fn list_secrets(&self, request: &ListSecretsRequest) -> Result<SecretPage> {
        let mut keys: Vec<String> = match kv2::list(&self.client, &self.config.mount_path, &self.config.path).await {
            Ok(keys) => keys,
            // Vault answers 404 for an empty directory.
            Err(ClientError::APIError { code: 404, .. }) => Vec::new(),
            Err(e) => return Err(self.map_error(&self.config.path, e)),
        };
        // Sub-directories are not secrets.
        keys.retain(|k| !k.ends_with('/'));
        keys.sort();

        let start = match &request.next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                CredentialsError::retrieval(format!("{}: invalid next token", self.name))
            })?,
            None => 0,
        };
        let page_size = request.max_results.map(|n| n.max(1) as usize).unwrap_or(DEFAULT_PAGE_SIZE);
        let end = (start + page_size).min(keys.len());

        let mut entries = Vec::new();
        for key in keys.iter().skip(start).take(page_size) {
            match self.read_summary(key).await {
                Ok(Some(summary)) if request.filters.iter().all(|f| f.matches(&summary)) => {
                    entries.push(summary)
                }
                Ok(_) => {}
                // Removed between list and metadata read.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        debug!(store = %self.name, start = start, count = entries.len(), "Listed Vault page");
        let next_token = (end < keys.len()).then(|| end.to_string());
        Ok(SecretPage { entries, next_token })
    }

    async fn get_secret_value(&self, id: &str) -> Result<SecretValue> {
        debug!(store = %self.name, key = %id, "Reading secret from Vault");

        let data: HashMap<String, serde_json::Value> =
            kv2::read(&self.client, &self.config.mount_path, &self.config.key_path(id))
                .await
                .map_err(|e| self.map_error(id, e))?;

        let text = data.get("value").and_then(|v| v.as_str()).map(str::to_string);
        let binary = data
            .get("binary")
            .and_then(|v| v.as_str())
            .map(|b| base64::engine::general_purpose::STANDARD.decode(b))
            .transpose()
            .map_err(|e| {
                CredentialsError::internal(format!("Secret '{}' has invalid base64 binary: {}", id, e))
            })?;

        SecretValue::from_parts(text, binary).ok_or_else(|| {
            CredentialsError::internal(format!(
                "Secret '{}' has neither a 'value' nor a 'binary' field",
                id
            ))
        })
    }

    fn store_name(&self) -> &str {
        &self.name
    }
}
