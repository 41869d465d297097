//! Remote secret store contract and listing types.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::filters::Filter;
use super::types::SecretValue;
use crate::credentials::Tags;
use crate::errors::Result;

/// Listing entry for one secret. Carries no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSummary {
    /// Unique secret name, stable across calls.
    pub id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(default)]
    pub tags: Tags,
}

impl SecretSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), description: String::new(), tags: Tags::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Stores report a missing description as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPage {
    pub entries: Vec<SecretSummary>,

    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

/// Parameters of a single listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsRequest {
    pub next_token: Option<String>,

    /// Server-side filters, passed through to the store unchanged.
    pub filters: Vec<Filter>,

    /// Requested page size; stores may return fewer entries.
    pub max_results: Option<u32>,
}

impl ListSecretsRequest {
    pub fn with_token(&self, next_token: impl Into<String>) -> Self {
        Self { next_token: Some(next_token.into()), ..self.clone() }
    }
}

/// Read-only view of a remote secret store.
///
/// Implementations must be safe for concurrent use: the pipeline lists while
/// credentials fetch payloads on other tasks.
///
/// # Errors
///
/// - [`CredentialsError::Retrieval`] on transport or service failure
/// - [`CredentialsError::NotFound`] if a secret does not exist
/// - [`CredentialsError::Deleted`] if a secret is scheduled for deletion
///
/// [`CredentialsError::Retrieval`]: crate::errors::CredentialsError::Retrieval
/// [`CredentialsError::NotFound`]: crate::errors::CredentialsError::NotFound
/// [`CredentialsError::Deleted`]: crate::errors::CredentialsError::Deleted
#[async_trait]
pub trait SecretsStore: Send + Sync + std::fmt::Debug {
    /// Fetch one page of secret summaries.
    async fn list_secrets(&self, request: &ListSecretsRequest) -> Result<SecretPage>;

    /// Fetch the payload of one secret by its remote id.
    async fn get_secret_value(&self, id: &str) -> Result<SecretValue>;

    /// Short name used in log fields.
    fn store_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_builder() {
        let summary = SecretSummary::new("foo")
            .with_description("Foo secret")
            .with_tag("credsync:username", "joe");

        assert_eq!(summary.id, "foo");
        assert_eq!(summary.description, "Foo secret");
        assert_eq!(summary.tags.get("credsync:username"), Some("joe"));
    }

    #[test]
    fn test_summary_deserialize_defaults() {
        let summary: SecretSummary = serde_json::from_str(r#"{"id": "bar"}"#).unwrap();
        assert_eq!(summary.description, "");
        assert!(summary.tags.is_empty());
    }

    #[test]
    fn test_summary_null_description_is_empty() {
        let summary: SecretSummary =
            serde_json::from_str(r#"{"id": "bar", "description": null}"#).unwrap();
        assert_eq!(summary.description, "");

        let summary: SecretSummary =
            serde_json::from_str(r#"{"id": "bar", "description": "Bar secret"}"#).unwrap();
        assert_eq!(summary.description, "Bar secret");
    }

    #[test]
    fn test_request_with_token_keeps_filters() {
        let request = ListSecretsRequest { max_results: Some(10), ..Default::default() };
        let next = request.with_token("abc");

        assert_eq!(next.next_token.as_deref(), Some("abc"));
        assert_eq!(next.max_results, Some(10));
    }
}
