//! Typed credentials.
//!
//! Every credential carries its identity ([`CredentialInfo`]) and a
//! [`LazySecret`] for the payload. Secret-bearing accessors are async and
//! fetch on first use; a payload that does not fit the credential's type
//! yields [`CredentialsError::Unavailable`] for that accessor only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::lazy::LazySecret;
use super::pem;
use super::tags::Tags;
use crate::errors::{CredentialsError, Result};
use crate::secrets::{SecretBytes, SecretString, SecretValue};

/// Concrete credential type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKind {
    String,
    UsernamePassword,
    SshUserPrivateKey,
    Certificate,
    File,
    Json,
}

impl CredentialKind {
    /// Type tag literal for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::UsernamePassword => "usernamePassword",
            Self::SshUserPrivateKey => "sshUserPrivateKey",
            Self::Certificate => "certificate",
            Self::File => "file",
            Self::Json => "json",
        }
    }
}

impl FromStr for CredentialKind {
    type Err = CredentialsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "usernamePassword" => Ok(Self::UsernamePassword),
            "sshUserPrivateKey" => Ok(Self::SshUserPrivateKey),
            "certificate" => Ok(Self::Certificate),
            "file" => Ok(Self::File),
            "json" => Ok(Self::Json),
            _ => Err(CredentialsError::config(format!("Unknown credential kind: {}", s))),
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity shared by all credential types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialInfo {
    /// Id shown to the host (after name transformation).
    pub id: String,
    /// Id of the secret in the remote store.
    pub remote_id: String,
    pub description: String,
    pub tags: Tags,
}

impl CredentialInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { remote_id: id.clone(), id, description: String::new(), tags: Tags::default() }
    }

    fn unavailable(&self, reason: impl Into<String>) -> CredentialsError {
        CredentialsError::unavailable(&self.id, reason)
    }
}

async fn text_value(info: &CredentialInfo, secret: &LazySecret) -> Result<SecretString> {
    match secret.resolve().await? {
        SecretValue::Text(text) => Ok(text.clone()),
        SecretValue::Binary(_) => Err(info.unavailable("secret value is binary, expected text")),
    }
}

/// Single secret string (API token, shared secret).
#[derive(Debug, Clone)]
pub struct StringCredential {
    info: CredentialInfo,
    secret: LazySecret,
}

impl StringCredential {
    pub fn new(info: CredentialInfo, secret: LazySecret) -> Self {
        Self { info, secret }
    }

    pub async fn secret(&self) -> Result<SecretString> {
        text_value(&self.info, &self.secret).await
    }
}

/// Username from tags, password from the payload.
#[derive(Debug, Clone)]
pub struct UsernamePasswordCredential {
    info: CredentialInfo,
    username: String,
    secret: LazySecret,
}

impl UsernamePasswordCredential {
    pub fn new(info: CredentialInfo, username: impl Into<String>, secret: LazySecret) -> Self {
        Self { info, username: username.into(), secret }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn password(&self) -> Result<SecretString> {
        text_value(&self.info, &self.secret).await
    }
}

/// Username from tags, PEM private key(s) from the payload. The passphrase is
/// always empty.
#[derive(Debug, Clone)]
pub struct SshUserPrivateKeyCredential {
    info: CredentialInfo,
    username: String,
    secret: LazySecret,
    passphrase: SecretString,
}

impl SshUserPrivateKeyCredential {
    pub fn new(info: CredentialInfo, username: impl Into<String>, secret: LazySecret) -> Self {
        Self { info, username: username.into(), secret, passphrase: SecretString::default() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn passphrase(&self) -> &SecretString {
        &self.passphrase
    }

    /// Every PEM private key block in the payload, in order.
    pub async fn private_keys(&self) -> Result<Vec<SecretString>> {
        private_keys_of(&self.info, &self.secret).await
    }
}

async fn private_keys_of(info: &CredentialInfo, secret: &LazySecret) -> Result<Vec<SecretString>> {
    let text = text_value(info, secret).await?;
    let blocks = pem::private_key_blocks(text.expose_secret());
    if blocks.is_empty() {
        return Err(info.unavailable("secret value is not a PEM private key"));
    }
    Ok(blocks.into_iter().map(SecretString::new).collect())
}

/// Binary key store (PKCS#12) with an empty key store password.
#[derive(Debug, Clone)]
pub struct CertificateCredential {
    info: CredentialInfo,
    secret: LazySecret,
    password: SecretString,
}

impl CertificateCredential {
    pub fn new(info: CredentialInfo, secret: LazySecret) -> Self {
        Self { info, secret, password: SecretString::default() }
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub async fn key_store(&self) -> Result<SecretBytes> {
        match self.secret.resolve().await? {
            SecretValue::Binary(bytes) => Ok(bytes.clone()),
            SecretValue::Text(_) => {
                Err(self.info.unavailable("certificate key store must be a binary secret"))
            }
        }
    }
}

/// Opaque file. Text payloads are returned as their UTF-8 bytes.
#[derive(Debug, Clone)]
pub struct FileCredential {
    info: CredentialInfo,
    file_name: String,
    secret: LazySecret,
}

impl FileCredential {
    pub fn new(info: CredentialInfo, file_name: impl Into<String>, secret: LazySecret) -> Self {
        Self { info, file_name: file_name.into(), secret }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub async fn content(&self) -> Result<SecretBytes> {
        Ok(self.secret.resolve().await?.to_bytes())
    }
}

/// Multi-field secret stored as a flat JSON object of strings.
#[derive(Debug, Clone)]
pub struct JsonCredential {
    info: CredentialInfo,
    secret: LazySecret,
}

impl JsonCredential {
    pub fn new(info: CredentialInfo, secret: LazySecret) -> Self {
        Self { info, secret }
    }

    pub async fn fields(&self) -> Result<BTreeMap<String, SecretString>> {
        let text = text_value(&self.info, &self.secret).await?;
        let value: serde_json::Value = serde_json::from_str(text.expose_secret())
            .map_err(|_| self.info.unavailable("secret value is not valid JSON"))?;

        let serde_json::Value::Object(object) = value else {
            return Err(self.info.unavailable("secret value is not a JSON object"));
        };

        object
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => Ok((key, SecretString::new(s))),
                _ => Err(self.info.unavailable(format!("field '{}' is not a string", key))),
            })
            .collect()
    }

    pub async fn field(&self, name: &str) -> Result<SecretString> {
        self.fields()
            .await?
            .remove(name)
            .ok_or_else(|| self.info.unavailable(format!("field '{}' is missing", name)))
    }
}

/// Legacy credential: username tag without a type tag.
///
/// Whether it is a username/password or an SSH key is decided from the payload
/// on first read and fixed afterwards.
#[derive(Debug, Clone)]
pub struct UsernameSecretCredential {
    info: CredentialInfo,
    username: String,
    secret: LazySecret,
    kind: Arc<OnceCell<CredentialKind>>,
}

impl UsernameSecretCredential {
    pub fn new(info: CredentialInfo, username: impl Into<String>, secret: LazySecret) -> Self {
        Self { info, username: username.into(), secret, kind: Arc::new(OnceCell::new()) }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Kind, if it has been decided already.
    pub fn decided_kind(&self) -> Option<CredentialKind> {
        self.kind.get().copied()
    }

    /// Decides the kind from the payload on first call.
    pub async fn resolve_kind(&self) -> Result<CredentialKind> {
        let kind = self
            .kind
            .get_or_try_init(|| async {
                let kind = match self.secret.resolve().await? {
                    SecretValue::Text(text) if pem::is_private_key(text.expose_secret()) => {
                        CredentialKind::SshUserPrivateKey
                    }
                    _ => CredentialKind::UsernamePassword,
                };
                tracing::debug!(id = %self.info.id, kind = %kind, "Decided credential kind");
                Ok::<_, CredentialsError>(kind)
            })
            .await?;
        Ok(*kind)
    }

    pub async fn password(&self) -> Result<SecretString> {
        match self.resolve_kind().await? {
            CredentialKind::UsernamePassword => text_value(&self.info, &self.secret).await,
            other => Err(self.info.unavailable(format!("credential resolved as {}", other))),
        }
    }

    pub fn passphrase(&self) -> SecretString {
        SecretString::default()
    }

    pub async fn private_keys(&self) -> Result<Vec<SecretString>> {
        match self.resolve_kind().await? {
            CredentialKind::SshUserPrivateKey => private_keys_of(&self.info, &self.secret).await,
            other => Err(self.info.unavailable(format!("credential resolved as {}", other))),
        }
    }
}

/// A classified credential.
#[derive(Debug, Clone)]
pub enum Credential {
    String(StringCredential),
    UsernamePassword(UsernamePasswordCredential),
    SshUserPrivateKey(SshUserPrivateKeyCredential),
    Certificate(CertificateCredential),
    File(FileCredential),
    Json(JsonCredential),
    UsernameSecret(UsernameSecretCredential),
}

impl Credential {
    pub fn info(&self) -> &CredentialInfo {
        match self {
            Self::String(c) => &c.info,
            Self::UsernamePassword(c) => &c.info,
            Self::SshUserPrivateKey(c) => &c.info,
            Self::Certificate(c) => &c.info,
            Self::File(c) => &c.info,
            Self::Json(c) => &c.info,
            Self::UsernameSecret(c) => &c.info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn remote_id(&self) -> &str {
        &self.info().remote_id
    }

    pub fn description(&self) -> &str {
        &self.info().description
    }

    pub fn tags(&self) -> &Tags {
        &self.info().tags
    }

    /// Username carried by username/password and SSH credentials.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::UsernamePassword(c) => Some(c.username()),
            Self::SshUserPrivateKey(c) => Some(c.username()),
            Self::UsernameSecret(c) => Some(c.username()),
            _ => None,
        }
    }

    /// Concrete kind. `None` only for a legacy credential not yet read.
    pub fn kind(&self) -> Option<CredentialKind> {
        match self {
            Self::String(_) => Some(CredentialKind::String),
            Self::UsernamePassword(_) => Some(CredentialKind::UsernamePassword),
            Self::SshUserPrivateKey(_) => Some(CredentialKind::SshUserPrivateKey),
            Self::Certificate(_) => Some(CredentialKind::Certificate),
            Self::File(_) => Some(CredentialKind::File),
            Self::Json(_) => Some(CredentialKind::Json),
            Self::UsernameSecret(c) => c.decided_kind(),
        }
    }

    /// Concrete kind, fetching the payload if that is what decides it.
    pub async fn resolve_kind(&self) -> Result<CredentialKind> {
        match self {
            Self::UsernameSecret(c) => c.resolve_kind().await,
            // Every other variant has a fixed kind.
            other => other
                .kind()
                .ok_or_else(|| CredentialsError::internal("credential kind undecided")),
        }
    }

    pub(crate) fn secret(&self) -> &LazySecret {
        match self {
            Self::String(c) => &c.secret,
            Self::UsernamePassword(c) => &c.secret,
            Self::SshUserPrivateKey(c) => &c.secret,
            Self::Certificate(c) => &c.secret,
            Self::File(c) => &c.secret,
            Self::Json(c) => &c.secret,
            Self::UsernameSecret(c) => &c.secret,
        }
    }

    /// True when reading this credential can never reach the remote store.
    pub fn is_detached(&self) -> bool {
        self.secret().is_captured()
    }

    /// Same credential, same variant, backed by `secret`.
    pub(crate) fn with_secret(&self, secret: LazySecret) -> Self {
        match self {
            Self::String(c) => Self::String(StringCredential { secret, ..c.clone() }),
            Self::UsernamePassword(c) => {
                Self::UsernamePassword(UsernamePasswordCredential { secret, ..c.clone() })
            }
            Self::SshUserPrivateKey(c) => {
                Self::SshUserPrivateKey(SshUserPrivateKeyCredential { secret, ..c.clone() })
            }
            Self::Certificate(c) => Self::Certificate(CertificateCredential { secret, ..c.clone() }),
            Self::File(c) => Self::File(FileCredential { secret, ..c.clone() }),
            Self::Json(c) => Self::Json(JsonCredential { secret, ..c.clone() }),
            Self::UsernameSecret(c) => Self::UsernameSecret(UsernameSecretCredential {
                info: c.info.clone(),
                username: c.username.clone(),
                secret,
                kind: Arc::new(c.kind.get().copied().map_or_else(OnceCell::new, |k| {
                    OnceCell::new_with(Some(k))
                })),
            }),
        }
    }
}
