mod client_secret;
mod credential;
mod drive_file;
mod upload;

pub use client_secret::ClientSecret;
pub use credential::Credential;
pub use drive_file::{DriveFile, FOLDER};
pub use upload::{is_media_error, MediaReadError, MultipartRelated};

use serde::Deserialize;

/// Body returned by the token endpoint for both the code exchange and a refresh.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub files: Vec<DriveFile>,
}
