//! Listing filters.
//!
//! Two kinds of filtering are supported:
//!
//! - [`Filter`]: a server-side filter expression (key class plus a set of
//!   values) handed to the remote store with every listing request.
//! - [`TagFilter`]: a client-side exact match on one tag key and value.
//!
//! Filter keys are parsed when configuration is built, so an unknown key
//! fails at startup rather than on the first listing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::client::SecretSummary;
use crate::errors::{CredentialsError, Result};

/// Key class of a server-side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKey {
    Name,
    Description,
    TagKey,
    TagValue,
    PrimaryRegion,
    OwningService,
    All,
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::TagKey => "tag-key",
            Self::TagValue => "tag-value",
            Self::PrimaryRegion => "primary-region",
            Self::OwningService => "owning-service",
            Self::All => "all",
        }
    }
}

impl FromStr for FilterKey {
    type Err = CredentialsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "tag-key" => Ok(Self::TagKey),
            "tag-value" => Ok(Self::TagValue),
            "primary-region" => Ok(Self::PrimaryRegion),
            "owning-service" => Ok(Self::OwningService),
            "all" => Ok(Self::All),
            _ => Err(CredentialsError::config(format!("Unknown filter key: '{}'", s))),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Server-side filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub key: FilterKey,
    pub values: Vec<String>,
}

impl Filter {
    /// Parses `key` eagerly; unknown keys are a configuration error.
    pub fn new<I, S>(key: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.parse()?;
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(CredentialsError::config(format!(
                "Filter '{}' must have at least one value",
                key
            )));
        }
        Ok(Self { key, values })
    }

    /// Reference evaluation of this filter against a summary.
    ///
    /// Follows the remote store's documented semantics: values are
    /// case-sensitive prefixes, a leading `!` negates a value, an entry
    /// passes when it matches any positive value (or there are none) and
    /// no negated value. Stores that filter natively do not call this.
    pub fn matches(&self, summary: &SecretSummary) -> bool {
        let (negated, positive): (Vec<&str>, Vec<&str>) = self
            .values
            .iter()
            .map(String::as_str)
            .partition(|v| v.starts_with('!'));

        if negated.iter().any(|v| self.matches_value(summary, &v[1..])) {
            return false;
        }

        positive.is_empty() || positive.iter().any(|v| self.matches_value(summary, v))
    }

    fn matches_value(&self, summary: &SecretSummary, prefix: &str) -> bool {
        let by_name = || summary.id.starts_with(prefix);
        let by_description = || summary.description.starts_with(prefix);
        let by_tag_key = || summary.tags.iter().any(|(k, _)| k.starts_with(prefix));
        let by_tag_value = || summary.tags.iter().any(|(_, v)| v.starts_with(prefix));

        match self.key {
            FilterKey::Name => by_name(),
            FilterKey::Description => by_description(),
            FilterKey::TagKey => by_tag_key(),
            FilterKey::TagValue => by_tag_value(),
            // Summaries do not carry replication or ownership data.
            FilterKey::PrimaryRegion | FilterKey::OwningService => false,
            FilterKey::All => by_name() || by_description() || by_tag_key() || by_tag_value(),
        }
    }
}

/// Client-side exact tag match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
}

impl TagFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn matches(&self, summary: &SecretSummary) -> bool {
        summary.tags.contains(&self.key, &self.value)
    }
}
