use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The OAuth client downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

// The console wraps the client in a section named after the application type.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

impl ClientSecret {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file = serde_json::from_str::<ClientSecretFile>(json)
            .with_context(|| "Could not parse client secret")?;

        file.installed
            .or(file.web)
            .ok_or_else(|| anyhow::anyhow!("client secret has neither an `installed` nor a `web` section"))
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read client secret file '{}'", path.display()))?;

        Self::from_json(&json)
    }
}
