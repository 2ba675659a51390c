/// Failures reported by the Google APIs or while talking to them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status
    #[error("GoogleAPIError {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body was not the expected JSON document
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}
