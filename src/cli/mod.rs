//! # Command Line Interface
//!
//! Lists and inspects credentials resolved from a JSON fixture file or from
//! Vault, and validates configuration files.

pub mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::{EndpointConfig, ProviderConfig};
use crate::errors::{CredentialsError, Result};
use crate::observability::{init_logging, log_config_info};
use crate::provider::CredentialsProvider;
use crate::secrets::{InMemorySecretsStore, SecretsStore};
use output::{print_credentials, print_json, CredentialView, OutputFormat};

#[derive(Parser)]
#[command(name = "credsync")]
#[command(about = "Resolve tag-classified credentials from a secret store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve secrets from a JSON fixture file instead of Vault
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every credential
    List {
        /// Fetch payloads and print secret material
        #[arg(long)]
        show_secrets: bool,
    },

    /// Show one credential by id
    Get {
        /// Credential id (after name transformation)
        id: String,

        /// Print secret material
        #[arg(long)]
        show_secrets: bool,
    },

    /// Validate configuration and print the effective values
    ValidateConfig,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ProviderConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;
    log_config_info(&config);

    match cli.command {
        Commands::ValidateConfig => {
            print_json(&config)?;
        }
        Commands::List { show_secrets } => {
            let provider = build_provider(&config, cli.fixtures.as_deref())?;
            let credentials = provider.list_all().await?;

            let mut views = Vec::with_capacity(credentials.len());
            for credential in &credentials {
                views.push(CredentialView::build(credential, show_secrets, show_secrets).await);
            }
            print_credentials(&views, cli.output)?;
        }
        Commands::Get { id, show_secrets } => {
            let provider = build_provider(&config, cli.fixtures.as_deref())?;
            let Some(credential) = provider.lookup_by_id(&id).await? else {
                bail!("Credential '{}' not found", id);
            };
            let view = CredentialView::build(&credential, true, show_secrets).await;
            print_credentials(std::slice::from_ref(&view), cli.output)?;
        }
    }

    Ok(())
}

fn build_provider(config: &ProviderConfig, fixtures: Option<&Path>) -> Result<CredentialsProvider> {
    match fixtures {
        Some(path) => {
            info!(path = %path.display(), "Using fixture store");
            let primary: Arc<dyn SecretsStore> = Arc::new(InMemorySecretsStore::from_fixture_file(path)?);
            CredentialsProvider::from_config(config, primary, connect_fixtures)
        }
        None => build_vault_provider(config),
    }
}

/// Endpoints in fixture mode name their own fixture file.
fn connect_fixtures(endpoint: &EndpointConfig) -> Result<Arc<dyn SecretsStore>> {
    let location = endpoint.location.as_deref().ok_or_else(|| {
        CredentialsError::config(format!("Endpoint '{}' needs a fixture file location", endpoint.name))
    })?;
    Ok(Arc::new(InMemorySecretsStore::from_fixture_file(location)?))
}

#[cfg(feature = "vault")]
fn build_vault_provider(config: &ProviderConfig) -> Result<CredentialsProvider> {
    use crate::secrets::{VaultSecretsStore, VaultStoreConfig};

    let vault = VaultStoreConfig::from_env().ok_or_else(|| {
        CredentialsError::config("No store configured: pass --fixtures or set CREDSYNC_VAULT_ADDR")
    })?;
    let primary: Arc<dyn SecretsStore> = Arc::new(VaultSecretsStore::new(vault.clone())?);

    // Endpoints in Vault mode are other paths on the same server.
    CredentialsProvider::from_config(config, primary, |endpoint| {
        let mut endpoint_config = vault.clone();
        if let Some(location) = &endpoint.location {
            endpoint_config.path = location.clone();
        }
        Ok(Arc::new(VaultSecretsStore::new(endpoint_config)?) as Arc<dyn SecretsStore>)
    })
}

#[cfg(not(feature = "vault"))]
fn build_vault_provider(_config: &ProviderConfig) -> Result<CredentialsProvider> {
    Err(CredentialsError::config("No store configured: pass --fixtures (built without Vault support)"))
}
