//! Installed application authorization: the user approves access in a browser which
//! is then redirected to a short lived listener on the loopback interface.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use axum::{extract::Query, http::StatusCode, routing::get, Extension, Router};
use reqwest::Url;
use tokio::{net::TcpListener, sync::oneshot};

use crate::google_drive::{
    oauth::AuthorizationFlow,
    types::{ClientSecret, Credential, TokenResponse},
    utils::{random_string, read_json},
    HTTP,
};

const SUCCESS_PAGE: &str =
    "The authentication flow has completed. You may close this window.";
const DECLINED_PAGE: &str = "Access was not granted. You may close this window.";
const FAILED_PAGE: &str = "The authentication flow failed.";
// time given to the server to flush the last page once the redirect is handled
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct LoopbackFlow;

#[async_trait]
impl AuthorizationFlow for LoopbackFlow {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> anyhow::Result<Credential> {
        let listener = RedirectListener::bind().await?;
        let redirect_uri = listener.redirect_uri();
        let state = random_string(30);

        let url = authorization_url(secret, scopes, &redirect_uri, &state)?;
        println!("Please visit this URL to authorize this application: {url}");

        let code = listener.wait_for_code(&state).await?;
        exchange_code(secret, scopes, &code, &redirect_uri).await
    }
}

pub fn authorization_url(
    secret: &ClientSecret,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> anyhow::Result<Url> {
    let scope = scopes.join(" ");

    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .with_context(|| format!("invalid auth_uri `{}`", secret.auth_uri))
}

#[tracing::instrument(skip(secret, code))]
pub async fn exchange_code(
    secret: &ClientSecret,
    scopes: &[String],
    code: &str,
    redirect_uri: &str,
) -> anyhow::Result<Credential> {
    let res = HTTP
        .post(&secret.token_uri)
        .form(&[
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .with_context(|| format!("Could not send post request to '{}'", secret.token_uri))?;
    let token = read_json::<TokenResponse>(res)
        .await
        .with_context(|| "Could not exchange authorization code")?;

    Credential::from_token(token, secret, scopes)
}

/// Accepts the browser redirect that carries the authorization code.
pub struct RedirectListener {
    listener: TcpListener,
    port: u16,
}

#[derive(Debug)]
enum Redirect {
    Code(String),
    Denied(String),
    Other,
}

// Shared with the route handler; the sender is taken by the first conclusive redirect.
struct Pending {
    state: String,
    tx: Mutex<Option<oneshot::Sender<anyhow::Result<String>>>>,
}

impl Pending {
    fn finish(&self, result: anyhow::Result<String>) {
        if let Ok(mut guard) = self.tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(result);
            }
        }
    }
}

impl RedirectListener {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .with_context(|| "Could not bind the redirect listener")?;
        let port = listener.local_addr()?.port();

        Ok(Self { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Serves the redirect endpoint until a request carrying `code` or `error`
    /// arrives. Other requests, such as a favicon fetch, get a 404 and are ignored.
    pub async fn wait_for_code(self, state: &str) -> anyhow::Result<String> {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(Pending {
            state: state.to_string(),
            tx: Mutex::new(Some(tx)),
        });

        let router = Router::new()
            .route("/", get(redirect_handler))
            .layer(Extension(pending));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(self.listener, router)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let result = rx.await;

        let _ = stop_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
            tracing::debug!("redirect listener still has open connections, leaving it behind");
        }

        result.with_context(|| "redirect listener stopped before a code arrived")?
    }
}

async fn redirect_handler(
    Extension(pending): Extension<Arc<Pending>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    match parse_redirect(&params, &pending.state) {
        Ok(Redirect::Other) => (StatusCode::NOT_FOUND, "Not found"),
        Ok(Redirect::Code(code)) => {
            pending.finish(Ok(code));
            (StatusCode::OK, SUCCESS_PAGE)
        }
        Ok(Redirect::Denied(error)) => {
            pending.finish(Err(anyhow::anyhow!("authorization was declined: {error}")));
            (StatusCode::OK, DECLINED_PAGE)
        }
        Err(e) => {
            pending.finish(Err(e));
            (StatusCode::BAD_REQUEST, FAILED_PAGE)
        }
    }
}

fn parse_redirect(params: &HashMap<String, String>, state: &str) -> anyhow::Result<Redirect> {
    let code = params.get("code");
    let error = params.get("error");

    if code.is_none() && error.is_none() {
        return Ok(Redirect::Other);
    }
    if params.get("state").map(String::as_str) != Some(state) {
        anyhow::bail!("state mismatch in authorization response");
    }

    match (code, error) {
        (_, Some(e)) => Ok(Redirect::Denied(e.clone())),
        (Some(c), None) => Ok(Redirect::Code(c.clone())),
        (None, None) => Ok(Redirect::Other),
    }
}
