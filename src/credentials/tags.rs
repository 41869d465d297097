//! Namespaced tag model.
//!
//! Tags come from the labels a secret carries in the remote store. A few keys
//! under the `credsync:` namespace drive classification; everything else is
//! carried through untouched.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Namespace prefix shared by all reserved tag keys.
pub const TAG_NAMESPACE: &str = "credsync:";

/// Declared credential type.
pub const TYPE_TAG: &str = "credsync:type";

/// Username for username/password and SSH key credentials.
pub const USERNAME_TAG: &str = "credsync:username";

/// File name for file credentials.
pub const FILENAME_TAG: &str = "credsync:filename";

/// Type literal assumed when a secret carries no type tag.
pub const DEFAULT_TYPE: &str = "default";

/// String key to string value mapping of a secret's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds tags from raw store pairs, dropping any pair with a missing key or value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Option<K>, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (Some(key), Some(value)) => Some((key.into(), value.into())),
                _ => None,
            })
            .collect();
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Declared type literal, `"default"` when untagged.
    pub fn declared_type(&self) -> &str {
        self.get(TYPE_TAG).unwrap_or(DEFAULT_TYPE)
    }

    pub fn username(&self) -> Option<&str> {
        self.get(USERNAME_TAG)
    }

    pub fn filename(&self) -> Option<&str> {
        self.get(FILENAME_TAG)
    }

    /// Tags outside the reserved namespace.
    pub fn unreserved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !k.starts_with(TAG_NAMESPACE))
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Stores may send null values; those entries are dropped.
        let raw = BTreeMap::<String, Option<String>>::deserialize(deserializer)?;
        Ok(Self::from_pairs(raw.into_iter().map(|(k, v)| (Some(k), v))))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
