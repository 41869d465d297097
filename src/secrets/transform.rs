//! Name and description transformations applied between listing and
//! classification.
//!
//! A transformation only changes what the host sees. The original remote id is
//! kept next to the transformed id so payload fetches still address the right
//! secret.

use serde::{Deserialize, Serialize};

/// Rewrites a remote secret id into the credential id shown to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameTransformation {
    #[default]
    Identity,
    /// Strip `prefix` when the id starts with it.
    RemovePrefix { prefix: String },
    /// Strip the longest matching prefix of the set.
    RemovePrefixes { prefixes: Vec<String> },
}

impl NameTransformation {
    pub fn apply(&self, id: &str) -> String {
        match self {
            Self::Identity => id.to_string(),
            Self::RemovePrefix { prefix } => id.strip_prefix(prefix.as_str()).unwrap_or(id).to_string(),
            Self::RemovePrefixes { prefixes } => prefixes
                .iter()
                .filter(|p| id.starts_with(p.as_str()))
                .max_by_key(|p| p.len())
                .map(|p| id[p.len()..].to_string())
                .unwrap_or_else(|| id.to_string()),
        }
    }
}

/// Controls whether secret descriptions reach the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionTransformation {
    #[default]
    Show,
    Hide,
}

impl DescriptionTransformation {
    pub fn apply(&self, description: &str) -> String {
        match self {
            Self::Show => description.to_string(),
            Self::Hide => String::new(),
        }
    }
}
