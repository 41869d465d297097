//! Output formatting for CLI commands
//!
//! Credentials are rendered as JSON or as a table. Secret material is only
//! included when explicitly requested.

use anyhow::{Context, Result};
use base64::Engine;
use serde::Serialize;

use crate::credentials::Credential;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Printable view of one credential.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialView {
    pub id: String,
    pub remote_id: String,
    /// Concrete kind, or `pending` for a legacy credential that was not read.
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CredentialView {
    /// Builds a view. With `resolve` set, the payload is fetched to decide the
    /// kind; with `reveal` set, secret material is included as well.
    pub async fn build(credential: &Credential, resolve: bool, reveal: bool) -> Self {
        let mut view = Self {
            id: credential.id().to_string(),
            remote_id: credential.remote_id().to_string(),
            kind: credential.kind().map_or("pending".to_string(), |k| k.to_string()),
            description: credential.description().to_string(),
            username: credential.username().map(str::to_string),
            file_name: match credential {
                Credential::File(c) => Some(c.file_name().to_string()),
                _ => None,
            },
            secret: None,
            error: None,
        };

        if resolve || reveal {
            match credential.resolve_kind().await {
                Ok(kind) => view.kind = kind.to_string(),
                Err(e) => view.error = Some(e.to_string()),
            }
        }

        if reveal && view.error.is_none() {
            match reveal_secret(credential).await {
                Ok(secret) => view.secret = Some(secret),
                Err(e) => view.error = Some(e.to_string()),
            }
        }
        view
    }
}

async fn reveal_secret(credential: &Credential) -> crate::errors::Result<String> {
    let encode = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);

    let secret = match credential {
        Credential::String(c) => c.secret().await?.expose_secret().to_string(),
        Credential::UsernamePassword(c) => c.password().await?.expose_secret().to_string(),
        Credential::SshUserPrivateKey(c) => join_keys(c.private_keys().await?),
        Credential::UsernameSecret(c) => match c.password().await {
            Ok(password) => password.expose_secret().to_string(),
            Err(_) => join_keys(c.private_keys().await?),
        },
        Credential::Certificate(c) => encode(c.key_store().await?.expose_secret()),
        Credential::File(c) => encode(c.content().await?.expose_secret()),
        Credential::Json(c) => {
            let fields: serde_json::Map<String, serde_json::Value> = c
                .fields()
                .await?
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v.expose_secret().to_string())))
                .collect();
            serde_json::Value::Object(fields).to_string()
        }
    };
    Ok(secret)
}

fn join_keys(keys: Vec<crate::secrets::SecretString>) -> String {
    keys.iter().map(|k| k.expose_secret()).collect::<Vec<_>>().join("")
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print credentials in the requested format
pub fn print_credentials(views: &[CredentialView], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&views),
        OutputFormat::Table => {
            print_table(views);
            Ok(())
        }
    }
}

fn print_table(views: &[CredentialView]) {
    let columns = [("ID", 32), ("KIND", 18), ("USERNAME", 16), ("DESCRIPTION", 40)];
    print_table_header(&columns);

    for view in views {
        println!(
            "{:<32} {:<18} {:<16} {:<40}",
            truncate(&view.id, 32),
            view.kind,
            truncate(view.username.as_deref().unwrap_or("-"), 16),
            truncate(&view.description, 40),
        );
        if let Some(error) = &view.error {
            println!("  error: {}", error);
        }
        if let Some(secret) = &view.secret {
            println!("  secret: {}", secret);
        }
    }
    println!();
    println!("{} credential(s)", views.len());
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!();
    let header: Vec<String> = columns.iter().map(|(name, width)| format!("{:<width$}", name, width = width)).collect();
    println!("{}", header.join(" "));
    let width = columns.iter().map(|(_, w)| w + 1).sum::<usize>();
    println!("{}", "-".repeat(width));
}
