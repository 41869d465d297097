//! # Error Handling
//!
//! Error types for credential resolution. Listing-level failures abort a whole
//! resolution pass; per-secret failures surface only when the affected field
//! is read.

use thiserror::Error;

/// Result type for credential operations.
pub type Result<T> = std::result::Result<T, CredentialsError>;

/// Errors that can occur while listing, classifying or reading credentials.
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// Transport or service failure while talking to the remote store.
    #[error("Retrieval failed: {message}")]
    Retrieval { message: String },

    /// Secret does not exist in the remote store.
    #[error("Secret not found: {id}")]
    NotFound { id: String },

    /// Secret exists but is scheduled for deletion.
    #[error("Secret is marked for deletion: {id}")]
    Deleted { id: String },

    /// A field of a credential cannot be produced from the secret payload.
    #[error("Credential '{id}' is unavailable: {reason}")]
    Unavailable { id: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Mutation attempted against the read-only credential store.
    #[error("Credential store is read-only: {operation} is not supported")]
    ReadOnly { operation: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CredentialsError {
    /// Create a retrieval error.
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval { message: message.into() }
    }

    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a deleted error.
    pub fn deleted(id: impl Into<String>) -> Self {
        Self::Deleted { id: id.into() }
    }

    /// Create a field-level unavailable error.
    pub fn unavailable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable { id: id.into(), reason: reason.into() }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a read-only error for the named operation.
    pub fn read_only(operation: impl Into<String>) -> Self {
        Self::ReadOnly { operation: operation.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True for both hard-deleted and soft-deleted secrets.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Deleted { .. })
    }

    /// True for transport/service failures.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval { .. })
    }
}

impl From<config::ConfigError> for CredentialsError {
    fn from(error: config::ConfigError) -> Self {
        Self::config(format!("Configuration loading failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for CredentialsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);
        messages.sort();

        Self::config(format!("Validation failed: {}", messages.join("; ")))
    }
}

/// Flattens nested validation errors into `path: message` lines.
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, error_messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = CredentialsError::not_found("foo");
        assert!(matches!(err, CredentialsError::NotFound { .. }));
        assert_eq!(err.to_string(), "Secret not found: foo");

        let err = CredentialsError::retrieval("timeout");
        assert!(err.is_retrieval());
        assert!(!err.is_not_found());

        let err = CredentialsError::unavailable("foo", "not a private key");
        assert!(err.to_string().contains("foo"));
        assert!(err.to_string().contains("not a private key"));
    }

    #[test]
    fn test_deleted_counts_as_not_found() {
        assert!(CredentialsError::deleted("foo").is_not_found());
        assert!(CredentialsError::not_found("foo").is_not_found());
        assert!(!CredentialsError::config("bad").is_not_found());
    }

    #[test]
    fn test_nested_validation_messages_keep_their_path() {
        use validator::Validate;

        #[derive(Validate)]
        struct Inner {
            #[validate(range(min = 1, message = "must be positive"))]
            ttl: u64,
        }

        #[derive(Validate)]
        struct Outer {
            #[validate(nested)]
            inner: Inner,
            #[validate(nested)]
            items: Vec<Inner>,
        }

        let outer = Outer { inner: Inner { ttl: 0 }, items: vec![Inner { ttl: 1 }, Inner { ttl: 0 }] };
        let err = CredentialsError::from(outer.validate().unwrap_err());

        assert!(matches!(err, CredentialsError::Config { .. }));
        let message = err.to_string();
        assert!(message.contains("inner.ttl: must be positive"), "{message}");
        assert!(message.contains("items[1].ttl: must be positive"), "{message}");
        assert!(!message.contains("items[0]"), "{message}");
    }

    #[test]
    fn test_read_only_display() {
        let err = CredentialsError::read_only("add");
        assert_eq!(err.to_string(), "Credential store is read-only: add is not supported");
    }
}
