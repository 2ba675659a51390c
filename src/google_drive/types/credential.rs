use std::{
    path::Path,
    time::{Duration, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{ClientSecret, TokenResponse};
use crate::google_drive::{utils::read_json, HTTP};

/// Token material persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Unix timestamp, in seconds, after which the access token is rejected
    pub expires_at: u64,
}

fn now() -> Result<Duration> {
    UNIX_EPOCH
        .elapsed()
        .with_context(|| "Time went backwards!")
}

impl Credential {
    pub fn from_token(token: TokenResponse, secret: &ClientSecret, scopes: &[String]) -> Result<Self> {
        let expires_at = now()? + Duration::from_secs(token.expires_in);

        Ok(Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes: scopes.to_vec(),
            expires_at: expires_at.as_secs(),
        })
    }

    pub fn is_expired(&self) -> Result<bool> {
        let exp = Duration::from_secs(self.expires_at);

        Ok(now()? >= exp)
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(!self.access_token.is_empty() && !self.is_expired()?)
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    #[tracing::instrument(skip(self), fields(token_uri = %self.token_uri))]
    pub async fn refresh(&mut self) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("credential has no refresh token"))?;

        let res = HTTP
            .post(&self.token_uri)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .with_context(|| format!("Could not send post request to '{}'", self.token_uri))?;
        let token = read_json::<TokenResponse>(res)
            .await
            .with_context(|| "Could not refresh access token")?;

        let expires_at = now()? + Duration::from_secs(token.expires_in);

        self.expires_at = expires_at.as_secs();
        self.access_token = token.access_token;
        if let Some(t) = token.refresh_token {
            self.refresh_token = Some(t);
        }

        Ok(())
    }

    /// Reads a persisted credential, `None` when the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        if !tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("Could not access '{}'", path.display()))?
        {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read credential file '{}'", path.display()))?;
        let credential = serde_json::from_str::<Self>(&json)
            .with_context(|| format!("Could not parse credential file '{}'", path.display()))?;

        Ok(Some(credential))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Could not write credential file '{}'", path.display()))
    }
}
