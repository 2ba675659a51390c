use crate::types::*;

use anyhow::Context;
use async_stream::stream;
use futures::{Stream, TryStreamExt};
use std::path;
use tokio::{fs, task};
use tokio_stream::wrappers as tsw;
use unwrap_or::unwrap_ok_or;

const DEFAULT_MIME: &str = "application/octet-stream";

pub async fn get_meta(path: &path::Path) -> anyhow::Result<FileMeta> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("'{}' does not name a file", path.display()))?;

    let meta = fs::metadata(path)
        .await
        .with_context(|| format!("Could not get metadata for file '{}'", path.display()))?;

    let file_type = if meta.is_file() {
        FileType::File
    } else if meta.is_dir() {
        FileType::Dir
    } else {
        FileType::Unknown
    };

    Ok(FileMeta {
        name,
        path: path.to_path_buf(),
        file_type,
        size: meta.len(),
    })
}

/// Streams the metadata of every entry directly inside `path`, without descending
/// into subdirectories.
pub fn list_meta(path: &path::Path) -> impl Stream<Item = anyhow::Result<FileMeta>> + '_ {
    stream! {
        let id = path.to_string_lossy().to_string();
        let rd = fs::read_dir(path)
            .await
            .with_context(|| format!("Could not read directory '{}'", id));
        let rd = unwrap_ok_or!(rd, e, {
            yield Err(e);
            return;
        });

        let s = tsw::ReadDirStream::new(rd)
            .map_err(move |e| {
                anyhow::Error::new(e).context(format!("Error while reading directory '{}'", id))
            })
            .and_then(|d| async move {
                let p = d.path();
                get_meta(p.as_path()).await
            });
        for await v in s { yield v; }
    }
}

/// Lists the entries of `path` ordered by name.
pub async fn list_sorted(path: &path::Path) -> anyhow::Result<Vec<FileMeta>> {
    let mut entries: Vec<FileMeta> = list_meta(path).try_collect().await?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

pub async fn read(path: &path::Path) -> anyhow::Result<fs::File> {
    let file = fs::File::open(path)
        .await
        .with_context(|| format!("Could not read file '{}'", path.to_string_lossy()))?;

    Ok(file)
}

/// Sniffs the content type of a file, falling back to `application/octet-stream`.
pub async fn get_mime(file: &path::Path) -> anyhow::Result<String> {
    let file = file.to_owned();

    task::spawn_blocking(move || {
        tree_magic_mini::from_filepath(file.as_path())
            .unwrap_or(DEFAULT_MIME)
            .to_string()
    })
    .await
    .with_context(|| "Mime detection task failed")
}
