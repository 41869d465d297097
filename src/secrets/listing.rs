//! Listing strategies.
//!
//! [`PaginatedLister`] walks every page of a store listing, starting from
//! scratch on each call. [`TagFilteredLister`] decorates any lister with a
//! client-side exact tag match.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::{ListSecretsRequest, SecretSummary, SecretsStore};
use super::filters::{Filter, TagFilter};
use crate::errors::{CredentialsError, Result};

/// Produces the full, finite list of secret summaries.
#[async_trait]
pub trait SecretLister: Send + Sync {
    async fn list(&self) -> Result<Vec<SecretSummary>>;
}

/// Lists all pages of a store, forwarding server-side filters.
///
/// A failure on any page discards the pages already fetched.
#[derive(Debug, Clone)]
pub struct PaginatedLister {
    store: Arc<dyn SecretsStore>,
    filters: Vec<Filter>,
    page_size: Option<u32>,
}

impl PaginatedLister {
    pub fn new(store: Arc<dyn SecretsStore>) -> Self {
        Self { store, filters: Vec::new(), page_size: None }
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl SecretLister for PaginatedLister {
    async fn list(&self) -> Result<Vec<SecretSummary>> {
        let mut request = ListSecretsRequest {
            next_token: None,
            filters: self.filters.clone(),
            max_results: self.page_size,
        };
        let mut summaries = Vec::new();
        let mut pages = 0usize;
        // A token seen before means the store is cycling.
        let mut seen_tokens: HashSet<String> = HashSet::new();

        loop {
            let page = self.store.list_secrets(&request).await.map_err(|e| {
                warn!(
                    store = %self.store.store_name(),
                    page = pages + 1,
                    error = %e,
                    "Listing failed; discarding partial results"
                );
                e
            })?;
            pages += 1;
            summaries.extend(page.entries);

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(CredentialsError::retrieval(format!(
                        "{} returned continuation token '{}' twice",
                        self.store.store_name(),
                        token
                    )));
                }
                Some(token) => request.next_token = Some(token),
                None => break,
            }
        }

        debug!(
            store = %self.store.store_name(),
            pages = pages,
            count = summaries.len(),
            "Listed secrets"
        );
        Ok(summaries)
    }
}

/// Keeps only summaries carrying an exact tag key and value.
#[derive(Debug, Clone)]
pub struct TagFilteredLister<L> {
    inner: L,
    filter: TagFilter,
}

impl<L: SecretLister> TagFilteredLister<L> {
    pub fn new(inner: L, filter: TagFilter) -> Self {
        Self { inner, filter }
    }
}

#[async_trait]
impl<L: SecretLister> SecretLister for TagFilteredLister<L> {
    async fn list(&self) -> Result<Vec<SecretSummary>> {
        let summaries = self.inner.list().await?;
        let total = summaries.len();
        let kept: Vec<SecretSummary> =
            summaries.into_iter().filter(|s| self.filter.matches(s)).collect();

        debug!(
            tag_key = %self.filter.key,
            kept = kept.len(),
            dropped = total - kept.len(),
            "Applied tag filter"
        );
        Ok(kept)
    }
}

#[async_trait]
impl<T: SecretLister + ?Sized> SecretLister for Box<T> {
    async fn list(&self) -> Result<Vec<SecretSummary>> {
        (**self).list().await
    }
}
