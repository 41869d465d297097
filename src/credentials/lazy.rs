//! Lazily fetched secret payloads.
//!
//! A [`LazySecret`] starts out holding only a handle to the remote store and
//! the secret's remote id. The first successful [`LazySecret::resolve`] call
//! fetches the payload and pins it; later calls reuse it. A failed fetch leaves
//! the cell unresolved so the next read retries.

use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::errors::Result;
use crate::secrets::{SecretValue, SecretsStore};

/// Where a lazy secret gets its value from.
#[derive(Clone)]
enum Source {
    Remote(Arc<dyn SecretsStore>),
    /// Value was captured up front; the remote store is never contacted.
    Captured,
}

struct Inner {
    remote_id: String,
    source: Source,
    value: OnceCell<SecretValue>,
}

/// Two-state cell: unresolved (remote handle) or resolved (fetched value).
///
/// Clones share the same cell, so all clones observe one fetch.
#[derive(Clone)]
pub struct LazySecret {
    inner: Arc<Inner>,
}

impl LazySecret {
    /// Unresolved cell backed by `store`.
    pub fn remote(store: Arc<dyn SecretsStore>, remote_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote_id: remote_id.into(),
                source: Source::Remote(store),
                value: OnceCell::new(),
            }),
        }
    }

    /// Already-resolved cell that never touches a remote store.
    pub fn captured(remote_id: impl Into<String>, value: SecretValue) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote_id: remote_id.into(),
                source: Source::Captured,
                value: OnceCell::new_with(Some(value)),
            }),
        }
    }

    /// Returns the payload, fetching it on first use.
    pub async fn resolve(&self) -> Result<&SecretValue> {
        let inner = &*self.inner;
        inner
            .value
            .get_or_try_init(|| async {
                match &inner.source {
                    Source::Remote(store) => {
                        debug!(
                            remote_id = %inner.remote_id,
                            store = %store.store_name(),
                            "Fetching secret value"
                        );
                        store.get_secret_value(&inner.remote_id).await
                    }
                    // A captured cell is initialised at construction.
                    Source::Captured => Err(crate::errors::CredentialsError::internal(format!(
                        "captured secret '{}' has no value",
                        inner.remote_id
                    ))),
                }
            })
            .await
    }

    pub fn remote_id(&self) -> &str {
        &self.inner.remote_id
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.value.initialized()
    }

    /// True when this cell can never reach the remote store.
    pub fn is_captured(&self) -> bool {
        matches!(self.inner.source, Source::Captured)
    }

    /// Resolves and returns a detached copy of this cell.
    pub async fn capture(&self) -> Result<LazySecret> {
        let value = self.resolve().await?.clone();
        Ok(Self::captured(self.remote_id(), value))
    }
}

impl fmt::Debug for LazySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySecret")
            .field("remote_id", &self.inner.remote_id)
            .field("captured", &self.is_captured())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{InMemorySecretsStore, SecretSummary};

    fn store_with(id: &str, value: &str) -> Arc<InMemorySecretsStore> {
        let store = InMemorySecretsStore::new();
        store.insert(SecretSummary::new(id), SecretValue::text(value));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_resolve_fetches_once() {
        let store = store_with("foo", "bar");
        let secret = LazySecret::remote(store.clone(), "foo");

        assert!(!secret.is_resolved());
        let value = secret.resolve().await.unwrap();
        assert_eq!(value.as_text().unwrap().expose_secret(), "bar");
        assert!(secret.is_resolved());

        secret.resolve().await.unwrap();
        assert_eq!(store.get_count("foo"), 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_fetch() {
        let store = store_with("foo", "bar");
        let secret = LazySecret::remote(store.clone(), "foo");
        let clone = secret.clone();

        secret.resolve().await.unwrap();
        clone.resolve().await.unwrap();
        assert_eq!(store.get_count("foo"), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let store = Arc::new(InMemorySecretsStore::new());
        let secret = LazySecret::remote(store.clone(), "late");

        assert!(secret.resolve().await.unwrap_err().is_not_found());
        assert!(!secret.is_resolved());

        store.insert(SecretSummary::new("late"), SecretValue::text("now here"));
        let value = secret.resolve().await.unwrap();
        assert_eq!(value.as_text().unwrap().expose_secret(), "now here");
    }

    #[tokio::test]
    async fn test_captured_never_calls_store() {
        let secret = LazySecret::captured("foo", SecretValue::text("bar"));
        assert!(secret.is_captured());
        assert!(secret.is_resolved());
        assert_eq!(secret.resolve().await.unwrap().as_text().unwrap().expose_secret(), "bar");
    }

    #[tokio::test]
    async fn test_capture_detaches() {
        let store = store_with("foo", "bar");
        let secret = LazySecret::remote(store.clone(), "foo");
        let captured = secret.capture().await.unwrap();

        store.set_failing(true);
        assert_eq!(captured.resolve().await.unwrap().as_text().unwrap().expose_secret(), "bar");
        assert_eq!(captured.remote_id(), "foo");
    }

    #[test]
    fn test_debug_does_not_leak() {
        let secret = LazySecret::captured("foo", SecretValue::text("hunter2"));
        let debug = format!("{:?}", secret);
        assert!(debug.contains("foo"));
        assert!(!debug.contains("hunter2"));
    }
}
