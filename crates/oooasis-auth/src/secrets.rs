//! OAuth client identity in the JSON shape the Google Cloud console exports.

use std::path::Path;

use anyhow::{Context, Result};
use oooasis_core::AuthError;
use serde::Deserialize;

/// Default secrets file, looked up in the working directory.
pub const DEFAULT_CLIENT_SECRETS: &str = "client_secret.json";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Desktop clients are exported under `installed`, web clients under `web`.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ClientSecrets {
    /// Load the client identity from a secrets file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        read_secrets(path).map_err(|e| AuthError::ClientSecrets(format!("{:#}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        parse_secrets(json).map_err(|e| AuthError::ClientSecrets(format!("{:#}", e)))
    }
}

fn read_secrets(path: &Path) -> Result<ClientSecrets> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_secrets(&json).with_context(|| format!("Invalid client secrets in {}", path.display()))
}

fn parse_secrets(json: &str) -> Result<ClientSecrets> {
    let file: SecretsFile = serde_json::from_str(json).context("Failed to parse client secrets")?;
    let secrets = file
        .installed
        .or(file.web)
        .context("Expected an \"installed\" or \"web\" client")?;

    if secrets.client_id.trim().is_empty() {
        anyhow::bail!("client_id is empty");
    }
    Ok(secrets)
}
