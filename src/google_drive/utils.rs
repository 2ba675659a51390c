use rand::{distributions::Alphanumeric, Rng};
use reqwest::Response;
use serde::de::DeserializeOwned;

use super::Error;

/// Reads a JSON body, turning non-success statuses into [`Error::Api`].
pub async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, Error> {
    let status = res.status();
    tracing::debug!("responded with status {status:?}");

    if !status.is_success() {
        let text = res.text().await?;
        return Err(Error::Api {
            status,
            message: api_message(&text),
        });
    }

    let bytes = res.bytes().await?;
    let t = serde_json::from_slice::<T>(&bytes)?;
    Ok(t)
}

/// Pulls the human readable part out of a Google error document.
///
/// Drive answers `{"error": {"message": ..}}` while the OAuth endpoints answer
/// `{"error": "..", "error_description": ".."}`.
fn api_message(body: &str) -> String {
    let value = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => v,
        Err(_) => return body.trim().to_string(),
    };

    let error = &value["error"];
    if let Some(m) = error["message"].as_str() {
        return m.to_string();
    }

    match (error.as_str(), value["error_description"].as_str()) {
        (Some(e), Some(d)) => format!("{e}: {d}"),
        (Some(e), None) => e.to_string(),
        _ => body.trim().to_string(),
    }
}

/// Quotes a value for use inside a Drive `q` search string.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
