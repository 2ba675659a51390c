use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    google_drive::types::{ClientSecret, Credential},
    settings::Settings,
};

/// Obtains a brand new credential with the user's consent.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> anyhow::Result<Credential>;
}

/// Produces a usable credential, reusing the persisted one when possible.
pub struct Authenticator<F> {
    token_path: PathBuf,
    client_secret_path: PathBuf,
    scopes: Vec<String>,
    flow: F,
}

impl<F: AuthorizationFlow> Authenticator<F> {
    pub fn new(settings: &Settings, flow: F) -> Self {
        Self {
            token_path: settings.token_path.clone(),
            client_secret_path: settings.client_secret_path.clone(),
            scopes: settings.scopes.clone(),
            flow,
        }
    }

    /// Loads the persisted credential and, when it cannot be used as is, either
    /// refreshes it or runs the authorization flow. Any new token is written back.
    pub async fn authenticate(&self) -> anyhow::Result<Credential> {
        let loaded = Credential::load(&self.token_path).await?;

        let credential = match loaded {
            Some(c) if c.is_valid()? => {
                tracing::debug!("using stored credential");
                return Ok(c);
            }
            Some(mut c) if c.refresh_token.is_some() && c.is_expired()? => {
                tracing::info!("access token expired, refreshing");
                c.refresh().await?;
                c
            }
            _ => {
                let secret = ClientSecret::load(&self.client_secret_path).await?;
                tracing::info!("no usable credential, starting authorization flow");
                self.flow.authorize(&secret, &self.scopes).await?
            }
        };

        credential.save(&self.token_path).await?;
        tracing::debug!("credential saved to {}", self.token_path.display());

        Ok(credential)
    }
}
