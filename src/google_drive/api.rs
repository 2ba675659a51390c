use anyhow::Context;
use reqwest::header::*;

use crate::{
    google_drive::{types::*, utils::*, Error, HTTP},
    local,
    types::FileMeta,
};

pub const RES_URI: &str = "https://www.googleapis.com/drive/v3/files";
pub const UPLOAD_URI: &str = "https://www.googleapis.com/upload/drive/v3/files";

lazy_static::lazy_static! {
    static ref GET_FIELDS: String = DriveFile::fields().join(",");
    static ref LIST_FIELDS: String = format!("files({})", GET_FIELDS.as_str());
}

/// Base URLs of the metadata and upload endpoints.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub files: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            files: RES_URI.to_string(),
            upload: UPLOAD_URI.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at another host, with the Drive v3 paths kept.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            files: format!("{base}/drive/v3/files"),
            upload: format!("{base}/upload/drive/v3/files"),
        }
    }
}

/// Drive v3 files resource, authorized with a single access token.
#[derive(Debug, Clone)]
pub struct Drive {
    endpoints: Endpoints,
    auth_header: String,
}

impl Drive {
    pub fn new(credential: &Credential) -> Self {
        Self {
            endpoints: Endpoints::default(),
            auth_header: credential.auth_header(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Looks up folders called `name`. When several exist the first one listed wins.
    #[tracing::instrument(skip(self))]
    pub async fn find_folder(&self, name: &str) -> Result<Option<DriveFile>, Error> {
        let q = format!(
            "name='{}' and mimeType='{}'",
            escape_query_value(name),
            FOLDER
        );

        let res = HTTP
            .get(&self.endpoints.files)
            .query(&[
                ("q", q.as_str()),
                ("spaces", "drive"),
                ("fields", LIST_FIELDS.as_str()),
            ])
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await?;
        let list = read_json::<ListResponse>(res).await?;

        if list.files.len() > 1 {
            tracing::warn!("{} folders named {name:?}, using the first one", list.files.len());
        }

        Ok(list.files.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_folder(&self, name: &str) -> Result<DriveFile, Error> {
        let res = HTTP
            .post(&self.endpoints.files)
            .query(&[("fields", GET_FIELDS.as_str())])
            .header(AUTHORIZATION, &self.auth_header)
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER,
            }))
            .send()
            .await?;

        read_json::<DriveFile>(res).await
    }

    /// Returns the id of the folder called `name`, creating it when missing.
    pub async fn resolve_folder(&self, name: &str) -> Result<String, Error> {
        if let Some(f) = self.find_folder(name).await? {
            tracing::debug!("reusing folder {}", f.id);
            return Ok(f.id);
        }

        let f = self.create_folder(name).await?;
        tracing::info!("created folder {name:?} with id {}", f.id);
        Ok(f.id)
    }

    /// Uploads a local file as a new child of `parent_id`, content and metadata
    /// in a single request.
    #[tracing::instrument(skip(self, file), fields(name = %file.name))]
    pub async fn upload_file(&self, file: &FileMeta, parent_id: &str) -> anyhow::Result<DriveFile> {
        let mime = local::get_mime(&file.path).await?;
        let media = local::read(&file.path).await?;
        let media_len = media
            .metadata()
            .await
            .with_context(|| format!("Could not get metadata for file '{}'", file.path.display()))?
            .len();

        let body = MultipartRelated::new(
            &serde_json::json!({
                "name": file.name,
                "parents": [parent_id],
            }),
            &mime,
        );

        let res = HTTP
            .post(&self.endpoints.upload)
            .query(&[("uploadType", "multipart"), ("fields", GET_FIELDS.as_str())])
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, body.content_type())
            .header(CONTENT_LENGTH, body.content_length(media_len))
            .body(body.into_body(media))
            .send()
            .await
            .map_err(|e| {
                // a local read failure is not a Drive error and must not be reported as one
                if is_media_error(&e) {
                    anyhow::Error::new(e)
                        .context(format!("Could not read file '{}'", file.path.display()))
                } else {
                    Error::from(e).into()
                }
            })?;

        let f = read_json::<DriveFile>(res).await?;
        tracing::debug!("uploaded {} bytes of {mime} as {}", media_len, f.id);
        Ok(f)
    }
}
