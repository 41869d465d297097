//! Credential factory registry.
//!
//! Each factory owns one value of the `credsync:type` tag. Classification reads
//! the declared type (`default` when absent), looks up the owning factory and
//! lets it build the credential. Secrets whose type no factory owns are left
//! out of the result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::lazy::LazySecret;
use super::tags::{Tags, DEFAULT_TYPE};
use super::types::{
    CertificateCredential, Credential, CredentialInfo, CredentialKind, FileCredential,
    JsonCredential, SshUserPrivateKeyCredential, StringCredential, UsernamePasswordCredential,
    UsernameSecretCredential,
};
use crate::errors::{CredentialsError, Result};
use crate::secrets::SecretsStore;

/// Everything a factory needs to build a credential. The payload is not
/// fetched here; `store` is only captured for later reads.
#[derive(Debug, Clone)]
pub struct TaggedCredentialRequest {
    pub id: String,
    pub remote_id: String,
    pub description: String,
    pub tags: Tags,
    pub store: Arc<dyn SecretsStore>,
}

impl TaggedCredentialRequest {
    pub fn new(id: impl Into<String>, store: Arc<dyn SecretsStore>) -> Self {
        let id = id.into();
        Self { remote_id: id.clone(), id, description: String::new(), tags: Tags::default(), store }
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = remote_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn info(&self) -> CredentialInfo {
        CredentialInfo {
            id: self.id.clone(),
            remote_id: self.remote_id.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Payload handle; nothing is fetched until first read.
    pub fn secret(&self) -> LazySecret {
        LazySecret::remote(self.store.clone(), &self.remote_id)
    }

    fn username(&self) -> Option<&str> {
        let username = self.tags.username();
        if username.is_none() {
            debug!(id = %self.id, "Secret has no username tag; skipping");
        }
        username
    }
}

/// Builds credentials for one declared type.
pub trait CredentialFactory: Send + Sync {
    /// Type tag literal this factory owns.
    fn credential_type(&self) -> &str;

    /// Builds a credential, or `None` when the metadata is insufficient.
    fn create(&self, request: &TaggedCredentialRequest) -> Option<Credential>;
}

/// Untyped legacy secrets: username tag means username/password or SSH key,
/// decided from the payload on first read; no username means a string secret.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl CredentialFactory for DefaultFactory {
    fn credential_type(&self) -> &str {
        DEFAULT_TYPE
    }

    fn create(&self, request: &TaggedCredentialRequest) -> Option<Credential> {
        let credential = match request.tags.username() {
            Some(username) => Credential::UsernameSecret(UsernameSecretCredential::new(
                request.info(),
                username,
                request.secret(),
            )),
            None => Credential::String(StringCredential::new(request.info(), request.secret())),
        };
        Some(credential)
    }
}

/// Factory for one of the explicitly typed credential kinds.
#[derive(Debug, Clone, Copy)]
pub struct TypedFactory {
    kind: CredentialKind,
}

impl TypedFactory {
    pub fn new(kind: CredentialKind) -> Self {
        Self { kind }
    }
}

impl CredentialFactory for TypedFactory {
    fn credential_type(&self) -> &str {
        self.kind.as_str()
    }

    fn create(&self, request: &TaggedCredentialRequest) -> Option<Credential> {
        let info = request.info();
        let secret = request.secret();

        let credential = match self.kind {
            CredentialKind::String => Credential::String(StringCredential::new(info, secret)),
            CredentialKind::UsernamePassword => Credential::UsernamePassword(
                UsernamePasswordCredential::new(info, request.username()?, secret),
            ),
            CredentialKind::SshUserPrivateKey => Credential::SshUserPrivateKey(
                SshUserPrivateKeyCredential::new(info, request.username()?, secret),
            ),
            CredentialKind::Certificate => {
                Credential::Certificate(CertificateCredential::new(info, secret))
            }
            CredentialKind::File => {
                let file_name = request.tags.filename().unwrap_or(&request.id).to_string();
                Credential::File(FileCredential::new(info, file_name, secret))
            }
            CredentialKind::Json => Credential::Json(JsonCredential::new(info, secret)),
        };
        Some(credential)
    }
}

/// Declared type to factory mapping.
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn CredentialFactory>>,
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("FactoryRegistry").field("types", &types).finish()
    }
}

impl FactoryRegistry {
    /// Registry with no factories.
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    /// The legacy factory and one factory per credential kind.
    pub fn builtin_factories() -> Vec<Arc<dyn CredentialFactory>> {
        vec![
            Arc::new(DefaultFactory),
            Arc::new(TypedFactory::new(CredentialKind::String)),
            Arc::new(TypedFactory::new(CredentialKind::UsernamePassword)),
            Arc::new(TypedFactory::new(CredentialKind::SshUserPrivateKey)),
            Arc::new(TypedFactory::new(CredentialKind::Certificate)),
            Arc::new(TypedFactory::new(CredentialKind::File)),
            Arc::new(TypedFactory::new(CredentialKind::Json)),
        ]
    }

    /// Registry over [`Self::builtin_factories`].
    pub fn builtin() -> Result<Self> {
        Self::with_factories(Self::builtin_factories())
    }

    /// Builds a registry from `factories`, failing on the first type claimed twice.
    pub fn with_factories<I>(factories: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn CredentialFactory>>,
    {
        let mut registry = Self::empty();
        for factory in factories {
            registry.register(factory)?;
        }
        Ok(registry)
    }

    /// Adds a factory. A type that is already owned is a configuration error.
    pub fn register(&mut self, factory: Arc<dyn CredentialFactory>) -> Result<()> {
        let credential_type = factory.credential_type().to_string();
        if self.factories.contains_key(&credential_type) {
            return Err(CredentialsError::config(format!(
                "Credential type '{}' is claimed by more than one factory",
                credential_type
            )));
        }
        info!(credential_type = %credential_type, "Registering credential factory");
        self.factories.insert(credential_type, factory);
        Ok(())
    }

    pub fn has_type(&self, credential_type: &str) -> bool {
        self.factories.contains_key(credential_type)
    }

    /// Classifies a secret. `None` means the secret is excluded.
    pub fn classify(&self, request: &TaggedCredentialRequest) -> Option<Credential> {
        let declared = request.tags.declared_type();
        match self.factories.get(declared) {
            Some(factory) => factory.create(request),
            None => {
                debug!(id = %request.id, credential_type = %declared, "No factory for type; skipping");
                None
            }
        }
    }
}
