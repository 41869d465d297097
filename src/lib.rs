//! # credsync
//!
//! Serves typed credentials classified from the secrets of a remote store.
//!
//! ## Architecture
//!
//! ```text
//! SecretsStore → Lister (pages, filters) → transformations → FactoryRegistry
//!                                                                  ↓
//!             CredentialsProvider ← ExpiringMemoizer ← dedup by id
//! ```
//!
//! ## Core Components
//!
//! - **Secrets**: the store abstraction, paginated listing and filters
//! - **Credentials**: tag and content based classification into typed
//!   credentials whose payloads are fetched on first read
//! - **Cache**: expiring memoizer with a single recomputation in flight
//! - **Provider**: the read-only, host-facing store
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credsync::config::ProviderConfig;
//! use credsync::provider::CredentialsProvider;
//! use credsync::secrets::{InMemorySecretsStore, SecretsStore};
//!
//! #[tokio::main]
//! async fn main() -> credsync::Result<()> {
//!     let config = ProviderConfig::from_env()?;
//!     let store: Arc<dyn SecretsStore> = Arc::new(InMemorySecretsStore::from_fixture_file("secrets.json")?);
//!     let provider = CredentialsProvider::from_config(&config, store, |_| {
//!         Err(credsync::CredentialsError::config("no endpoints"))
//!     })?;
//!
//!     for credential in provider.list_all().await? {
//!         println!("{} {:?}", credential.id(), credential.kind());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod provider;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::ProviderConfig;
pub use credentials::{Credential, CredentialKind};
pub use errors::{CredentialsError, Result};
pub use provider::CredentialsProvider;

/// Application name
pub const APP_NAME: &str = "credsync";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
