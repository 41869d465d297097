//! Expiring single-flight memoizer.
//!
//! [`ExpiringMemoizer`] wraps a "compute the whole value now" function. A
//! fresh value is served from a read lock. A stale or empty cache takes the
//! refresh mutex, re-checks freshness (another task may have refreshed while
//! this one waited) and only then recomputes. Exactly one recomputation runs
//! per staleness episode; everyone else waits for it and shares its result.
//!
//! Failures are returned to the caller that ran the recomputation and are not
//! stored: the expiry is not advanced, so the next call recomputes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::errors::{CredentialsError, Result};

#[derive(Debug)]
struct Entry<T> {
    value: T,
    /// `None` when `now + ttl` is beyond the clock's range.
    expires_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Time-bounded memoizer with at most one concurrent recomputation.
#[derive(Debug)]
pub struct ExpiringMemoizer<T> {
    state: RwLock<Option<Entry<T>>>,
    refresh: Mutex<()>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync> ExpiringMemoizer<T> {
    /// Creates an empty memoizer. A zero TTL is a configuration error.
    pub fn new(ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CredentialsError::config("Cache TTL must be greater than zero"));
        }
        Ok(Self { state: RwLock::new(None), refresh: Mutex::new(()), ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value if fresh, otherwise recomputes it with `compute`.
    pub async fn get<F, Fut>(&self, compute: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh_value().await {
            debug!("Cache hit");
            return Ok(value);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(value) = self.fresh_value().await {
            debug!("Cache refreshed by a concurrent caller");
            return Ok(value);
        }

        debug!(ttl_ms = self.ttl.as_millis() as u64, "Cache stale; recomputing");
        let value = compute().await?;

        let expires_at = Instant::now().checked_add(self.ttl);
        *self.state.write().await = Some(Entry { value: value.clone(), expires_at });
        Ok(value)
    }

    /// Last successfully computed value, fresh or not.
    pub async fn last_value(&self) -> Option<T> {
        self.state.read().await.as_ref().map(|entry| entry.value.clone())
    }

    /// Marks the cached value stale without discarding it.
    pub async fn expire(&self) {
        if let Some(entry) = self.state.write().await.as_mut() {
            entry.expires_at = Some(Instant::now());
        }
    }

    async fn fresh_value(&self) -> Option<T> {
        let state = self.state.read().await;
        state.as_ref().filter(|entry| entry.is_fresh(Instant::now())).map(|entry| entry.value.clone())
    }
}
