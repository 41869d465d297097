//! In-memory secrets store.
//!
//! Intended for **development and testing**. Behaves like a paginated remote
//! store: listings are split into pages with opaque continuation tokens,
//! server-side filters are evaluated with [`Filter::matches`], and soft-deleted
//! secrets are hidden from listings and rejected on fetch.
//!
//! Secrets can also be seeded from a JSON fixture file:
//!
//! ```json
//! [
//!   { "id": "db-password", "tags": { "credsync:username": "joe" }, "secret_string": "hunter2" },
//!   { "id": "keystore", "tags": { "credsync:type": "certificate" }, "secret_binary": "MIIK..." }
//! ]
//! ```
//!
//! [`Filter::matches`]: super::filters::Filter::matches

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use super::client::{ListSecretsRequest, SecretPage, SecretSummary, SecretsStore};
use super::types::SecretValue;
use crate::credentials::Tags;
use crate::errors::{CredentialsError, Result};

/// Default number of entries per page.
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct StoredSecret {
    summary: SecretSummary,
    value: Option<SecretValue>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Insertion order is listing order.
    secrets: Vec<StoredSecret>,
    failing: bool,
    fail_on_list_call: Option<usize>,
    list_calls: usize,
    get_calls: HashMap<String, usize>,
}

/// Paginated in-memory secrets store (development and tests only).
#[derive(Debug)]
pub struct InMemorySecretsStore {
    name: String,
    page_size: usize,
    state: RwLock<State>,
}

impl Default for InMemorySecretsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySecretsStore {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), page_size: DEFAULT_PAGE_SIZE, state: RwLock::default() }
    }

    /// Caps the page size. Values below one are raised to one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds a secret, or replaces the existing secret with the same id.
    pub fn insert(&self, summary: SecretSummary, value: SecretValue) {
        self.upsert(StoredSecret { summary, value: Some(value), deleted: false });
    }

    /// Adds a listing entry with no payload; fetching it fails as a
    /// server-state error.
    pub fn insert_without_value(&self, summary: SecretSummary) {
        self.upsert(StoredSecret { summary, value: None, deleted: false });
    }

    /// Appends an entry even if one with the same id exists, so a listing
    /// can return duplicates.
    pub fn push_duplicate(&self, summary: SecretSummary, value: SecretValue) {
        self.write().secrets.push(StoredSecret { summary, value: Some(value), deleted: false });
    }

    /// Hard-deletes a secret.
    pub fn remove(&self, id: &str) {
        self.write().secrets.retain(|s| s.summary.id != id);
    }

    /// Marks a secret as scheduled for deletion.
    pub fn mark_deleted(&self, id: &str) {
        for secret in self.write().secrets.iter_mut().filter(|s| s.summary.id == id) {
            secret.deleted = true;
        }
    }

    /// Makes every call fail with a retrieval error while set.
    pub fn set_failing(&self, failing: bool) {
        self.write().failing = failing;
    }

    /// Fails the `n`th listing call (1-based) counted from now.
    pub fn fail_on_list_call(&self, n: usize) {
        let mut state = self.write();
        state.fail_on_list_call = Some(state.list_calls + n);
    }

    /// Number of listing calls served so far.
    pub fn list_count(&self) -> usize {
        self.read().list_calls
    }

    /// Number of payload fetches for `id` so far.
    pub fn get_count(&self, id: &str) -> usize {
        self.read().get_calls.get(id).copied().unwrap_or(0)
    }

    /// Loads secrets from a JSON fixture file.
    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let store = Self::named(path.display().to_string());
        store.load_fixtures(&content)?;
        Ok(store)
    }

    /// Loads secrets from JSON fixture text.
    pub fn load_fixtures(&self, json: &str) -> Result<()> {
        let fixtures: Vec<Fixture> = serde_json::from_str(json)?;
        for fixture in fixtures {
            let binary = fixture
                .secret_binary
                .map(|b| base64::engine::general_purpose::STANDARD.decode(b))
                .transpose()
                .map_err(|e| {
                    CredentialsError::config(format!(
                        "Fixture '{}' has invalid base64 binary: {}",
                        fixture.id, e
                    ))
                })?;

            let summary = SecretSummary {
                id: fixture.id,
                description: fixture.description.unwrap_or_default(),
                tags: fixture.tags,
            };
            match SecretValue::from_parts(fixture.secret_string, binary) {
                Some(value) => self.insert(summary, value),
                None => self.insert_without_value(summary),
            }
        }
        Ok(())
    }

    fn upsert(&self, secret: StoredSecret) {
        let mut state = self.write();
        match state.secrets.iter_mut().find(|s| s.summary.id == secret.summary.id) {
            Some(existing) => *existing = secret,
            None => state.secrets.push(secret),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Tags,
    #[serde(default)]
    secret_string: Option<String>,
    /// Base64-encoded.
    #[serde(default)]
    secret_binary: Option<String>,
}

#[async_trait]
impl SecretsStore for InMemorySecretsStore {
    async fn list_secrets(&self, request: &ListSecretsRequest) -> Result<SecretPage> {
        let mut state = self.write();
        state.list_calls += 1;

        if state.failing || state.fail_on_list_call == Some(state.list_calls) {
            return Err(CredentialsError::retrieval(format!(
                "{}: listing unavailable",
                self.name
            )));
        }

        let start = match &request.next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                CredentialsError::retrieval(format!("{}: invalid next token", self.name))
            })?,
            None => 0,
        };

        let page_size = request
            .max_results
            .map(|n| (n as usize).clamp(1, self.page_size))
            .unwrap_or(self.page_size);

        let visible: Vec<&StoredSecret> = state
            .secrets
            .iter()
            .filter(|s| !s.deleted)
            .filter(|s| request.filters.iter().all(|f| f.matches(&s.summary)))
            .collect();

        let entries: Vec<SecretSummary> =
            visible.iter().skip(start).take(page_size).map(|s| s.summary.clone()).collect();
        let end = start + entries.len();
        let next_token = (end < visible.len()).then(|| end.to_string());

        Ok(SecretPage { entries, next_token })
    }

    async fn get_secret_value(&self, id: &str) -> Result<SecretValue> {
        let mut state = self.write();
        *state.get_calls.entry(id.to_string()).or_insert(0) += 1;

        if state.failing {
            return Err(CredentialsError::retrieval(format!("{}: fetch unavailable", self.name)));
        }

        // Last entry wins when duplicates were pushed.
        let secret = state
            .secrets
            .iter()
            .rev()
            .find(|s| s.summary.id == id)
            .ok_or_else(|| CredentialsError::not_found(id))?;

        if secret.deleted {
            return Err(CredentialsError::deleted(id));
        }

        secret.value.clone().ok_or_else(|| {
            CredentialsError::internal(format!(
                "Secret '{}' has neither a text nor a binary value",
                id
            ))
        })
    }

    fn store_name(&self) -> &str {
        &self.name
    }
}
