use std::error::Error as _;

use bytes::Bytes;
use futures::{future, stream, StreamExt, TryStreamExt};
use reqwest::Body;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::google_drive::utils::random_string;

/// Raised through the request body when the media reader fails partway through
/// an upload.
#[derive(Debug, thiserror::Error)]
#[error("Could not read media: {0}")]
pub struct MediaReadError(#[source] pub std::io::Error);

/// Whether a failed request was caused by reading the local media rather than by
/// the transport or the remote side.
pub fn is_media_error(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<MediaReadError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// A `multipart/related` body: the JSON metadata part followed by the media part.
///
/// Only the framing is held in memory, the media is streamed from its reader.
#[derive(Debug)]
pub struct MultipartRelated {
    boundary: String,
    head: Bytes,
    tail: Bytes,
}

impl MultipartRelated {
    pub fn new(metadata: &serde_json::Value, media_type: &str) -> Self {
        Self::with_boundary(random_string(32), metadata, media_type)
    }

    fn with_boundary(boundary: String, metadata: &serde_json::Value, media_type: &str) -> Self {
        let head = format!(
            "--{boundary}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{boundary}\r\n\
             Content-Type: {media_type}\r\n\r\n"
        );
        let tail = format!("\r\n--{boundary}--\r\n");

        Self {
            boundary,
            head: Bytes::from(head),
            tail: Bytes::from(tail),
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }

    pub fn content_length(&self, media_len: u64) -> u64 {
        (self.head.len() + self.tail.len()) as u64 + media_len
    }

    pub fn into_body<R>(self, media: R) -> Body
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let s = stream::once(future::ready(Ok::<_, MediaReadError>(self.head)))
            .chain(ReaderStream::new(media).map_err(MediaReadError))
            .chain(stream::once(future::ready(Ok(self.tail))));

        Body::wrap_stream(s)
    }
}
