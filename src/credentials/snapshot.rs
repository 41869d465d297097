//! Detached credential copies.
//!
//! [`snapshot`] reads a credential's payload once and returns the same
//! credential backed by the captured value. A snapshot never contacts the
//! remote store again. [`SnapshotRecord`] is the serialisable form of a
//! snapshot, for hosts that persist credentials or pass them between
//! processes.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::lazy::LazySecret;
use super::types::{
    CertificateCredential, Credential, CredentialInfo, CredentialKind, FileCredential,
    JsonCredential, SshUserPrivateKeyCredential, StringCredential, UsernamePasswordCredential,
};
use crate::errors::{CredentialsError, Result};
use crate::secrets::SecretValue;

/// Captures the payload of `credential` and returns a detached copy of the
/// same variant.
///
/// A legacy credential has its kind decided during the capture, so the
/// snapshot and the source agree on it.
pub async fn snapshot(credential: &Credential) -> Result<Credential> {
    if credential.is_detached() {
        return Ok(credential.clone());
    }

    let captured = credential.secret().capture().await?;
    credential.resolve_kind().await?;
    debug!(id = %credential.id(), "Captured credential snapshot");
    Ok(credential.with_secret(captured))
}

/// Payload of a [`SnapshotRecord`]. Binary payloads are base64-encoded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum SnapshotPayload {
    Text(String),
    Base64(String),
}

impl fmt::Debug for SnapshotPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(_) => write!(f, "Text([REDACTED])"),
            Self::Base64(_) => write!(f, "Base64([REDACTED])"),
        }
    }
}

impl SnapshotPayload {
    fn from_value(value: &SecretValue) -> Self {
        match value {
            SecretValue::Text(text) => Self::Text(text.expose_secret().to_string()),
            SecretValue::Binary(bytes) => {
                Self::Base64(base64::engine::general_purpose::STANDARD.encode(bytes.expose_secret()))
            }
        }
    }

    fn to_value(&self) -> Result<SecretValue> {
        match self {
            Self::Text(text) => Ok(SecretValue::text(text.as_str())),
            Self::Base64(data) => base64::engine::general_purpose::STANDARD
                .decode(data)
                .map(SecretValue::binary)
                .map_err(|e| CredentialsError::internal(format!("Invalid snapshot payload: {}", e))),
        }
    }
}

/// Self-contained, serialisable form of a snapshot credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(flatten)]
    pub info: CredentialInfo,
    pub kind: CredentialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub payload: SnapshotPayload,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Builds a record from a snapshot. Remote-backed credentials are
    /// rejected; take a [`snapshot`] first.
    pub async fn from_credential(credential: &Credential) -> Result<Self> {
        if !credential.is_detached() {
            return Err(CredentialsError::internal(format!(
                "Credential '{}' is not a snapshot",
                credential.id()
            )));
        }

        let kind = credential.resolve_kind().await?;
        let payload = SnapshotPayload::from_value(credential.secret().resolve().await?);
        let file_name = match credential {
            Credential::File(c) => Some(c.file_name().to_string()),
            _ => None,
        };

        Ok(Self {
            info: credential.info().clone(),
            kind,
            username: credential.username().map(str::to_string),
            file_name,
            payload,
            captured_at: Utc::now(),
        })
    }

    /// Rebuilds the detached credential.
    pub fn into_credential(self) -> Result<Credential> {
        let secret = LazySecret::captured(&self.info.remote_id, self.payload.to_value()?);
        let info = self.info.clone();

        let username = || {
            self.username.clone().ok_or_else(|| {
                CredentialsError::internal(format!(
                    "Snapshot of '{}' ({}) has no username",
                    info.id, self.kind
                ))
            })
        };

        let credential = match self.kind {
            CredentialKind::String => Credential::String(StringCredential::new(info.clone(), secret)),
            CredentialKind::UsernamePassword => Credential::UsernamePassword(
                UsernamePasswordCredential::new(info.clone(), username()?, secret),
            ),
            CredentialKind::SshUserPrivateKey => Credential::SshUserPrivateKey(
                SshUserPrivateKeyCredential::new(info.clone(), username()?, secret),
            ),
            CredentialKind::Certificate => {
                Credential::Certificate(CertificateCredential::new(info.clone(), secret))
            }
            CredentialKind::File => {
                let file_name = self.file_name.clone().unwrap_or_else(|| info.id.clone());
                Credential::File(FileCredential::new(info.clone(), file_name, secret))
            }
            CredentialKind::Json => Credential::Json(JsonCredential::new(info.clone(), secret)),
        };
        Ok(credential)
    }
}
