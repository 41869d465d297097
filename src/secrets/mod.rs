//! Remote secret store access.
//!
//! The store itself is an external collaborator seen through the
//! [`SecretsStore`] trait: a paginated listing of summaries plus a
//! single-secret payload fetch. On top of it this module provides:
//!
//! - [`PaginatedLister`]: walks every page, all or nothing
//! - [`TagFilteredLister`]: client-side exact tag match
//! - [`Filter`]: server-side filter expressions, parsed at configuration time
//! - [`NameTransformation`] / [`DescriptionTransformation`]: rewrite what the
//!   host sees without losing the remote id
//!
//! # Stores
//!
//! - [`InMemorySecretsStore`]: paginated in-memory store for development and tests
//! - `VaultSecretsStore`: HashiCorp Vault KV v2 (feature `vault`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credsync::secrets::{InMemorySecretsStore, PaginatedLister, SecretLister, SecretSummary, SecretValue};
//!
//! # async fn example() -> credsync::errors::Result<()> {
//! let store = InMemorySecretsStore::new();
//! store.insert(SecretSummary::new("db-password"), SecretValue::text("hunter2"));
//!
//! let summaries = PaginatedLister::new(Arc::new(store)).list().await?;
//! assert_eq!(summaries.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod filters;
pub mod listing;
pub mod memory;
pub mod transform;
pub mod types;
#[cfg(feature = "vault")]
pub mod vault;

pub use client::{ListSecretsRequest, SecretPage, SecretSummary, SecretsStore};
pub use filters::{Filter, FilterKey, TagFilter};
pub use listing::{PaginatedLister, SecretLister, TagFilteredLister};
pub use memory::InMemorySecretsStore;
pub use transform::{DescriptionTransformation, NameTransformation};
pub use types::{SecretBytes, SecretString, SecretValue};
#[cfg(feature = "vault")]
pub use vault::{VaultSecretsStore, VaultStoreConfig};
