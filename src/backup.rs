use std::io::Write;

use crate::{
    google_drive::{self as gd, Drive},
    local,
    settings::Settings,
    types::Report,
};

#[derive(Debug)]
pub enum Outcome {
    Completed(Report),
    /// A Drive request failed and the error line was written
    Failed,
}

/// Uploads every file of the source directory into the backup folder, writing one
/// line to `out` per uploaded file.
///
/// The first Drive failure stops the run: it is written to `out` as a single
/// `Error:` line and reported as [`Outcome::Failed`]. Local failures are returned.
pub async fn run<W: Write>(drive: &Drive, settings: &Settings, out: &mut W) -> anyhow::Result<Outcome> {
    match upload_all(drive, settings, out).await {
        Ok(report) => Ok(Outcome::Completed(report)),
        Err(e) => match e.downcast_ref::<gd::Error>() {
            Some(de) => {
                tracing::error!("backup aborted: {e:#}");
                writeln!(out, "Error: {de}")?;
                out.flush()?;
                Ok(Outcome::Failed)
            }
            None => Err(e),
        },
    }
}

async fn upload_all<W: Write>(drive: &Drive, settings: &Settings, out: &mut W) -> anyhow::Result<Report> {
    let folder_id = drive.resolve_folder(&settings.folder_name).await?;
    let entries = local::list_sorted(&settings.source_dir).await?;

    let mut report = Report {
        folder_id,
        uploaded: Vec::with_capacity(entries.len()),
        skipped: Vec::new(),
    };

    for entry in entries {
        if !entry.is_file() {
            tracing::warn!("skipping {}, not a regular file", entry.path.display());
            report.skipped.push(entry.name);
            continue;
        }

        drive.upload_file(&entry, &report.folder_id).await?;

        writeln!(out, "Backed up file: {}", entry.name)?;
        out.flush()?;
        report.uploaded.push(entry.name);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_drive::{Credential, Endpoints};
    use mockito::{Matcher, Mock, Server};
    use temp_dir::TempDir;

    const FOLDER_QUERY: &str =
        "name='BackupFolderPC' and mimeType='application/vnd.google-apps.folder'";

    struct Fixture {
        _dir: TempDir,
        settings: Settings,
        drive: Drive,
    }

    fn fixture(server: &Server, files: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.child("source");
        std::fs::create_dir(&source).unwrap();
        for name in files {
            std::fs::write(source.join(name), format!("content of {name}")).unwrap();
        }

        let settings = Settings {
            source_dir: source,
            token_path: dir.child("token.json"),
            client_secret_path: dir.child("credentials.json"),
            ..Settings::default()
        };
        let credential = Credential {
            access_token: "test-token".into(),
            refresh_token: None,
            token_uri: format!("{}/token", server.url()),
            client_id: "client".into(),
            client_secret: "secret".into(),
            scopes: settings.scopes.clone(),
            expires_at: u64::MAX,
        };
        let drive = Drive::new(&credential).with_endpoints(Endpoints::with_base(&server.url()));

        Fixture {
            _dir: dir,
            settings,
            drive,
        }
    }

    async fn mock_list(server: &mut Server, body: &str) -> Mock {
        server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::UrlEncoded("q".into(), FOLDER_QUERY.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    async fn mock_create(server: &mut Server, hits: usize) -> Mock {
        server
            .mock("POST", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "created-folder", "name": "BackupFolderPC", "mimeType": "application/vnd.google-apps.folder"}"#)
            .expect(hits)
            .create_async()
            .await
    }

    async fn mock_upload(server: &mut Server, name: &str, parent: &str, status: usize) -> Mock {
        let body = if status == 200 {
            format!(r#"{{"id": "id-{name}", "name": "{name}", "mimeType": "text/plain"}}"#)
        } else {
            r#"{"error": {"code": 500, "message": "Internal Error"}}"#.to_string()
        };
        server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(format!(r#""name":"{}""#, regex::escape(name))),
                Matcher::Regex(format!(r#""parents":\["{}"\]"#, regex::escape(parent))),
            ]))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn creates_missing_folder_and_uploads_every_file() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &["b.txt", "a.txt", "c.txt"]);

        let list = mock_list(&mut server, r#"{"files": []}"#).await;
        let create = mock_create(&mut server, 1).await;
        let mut uploads = Vec::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            uploads.push(mock_upload(&mut server, name, "created-folder", 200).await);
        }

        let mut out = Vec::new();
        let outcome = run(&f.drive, &f.settings, &mut out).await?;

        let report = match outcome {
            Outcome::Completed(r) => r,
            Outcome::Failed => panic!("backup failed: {:?}", lines(out)),
        };
        assert_eq!(report.folder_id, "created-folder");
        assert_eq!(report.uploaded, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(
            lines(out),
            vec![
                "Backed up file: a.txt",
                "Backed up file: b.txt",
                "Backed up file: c.txt",
            ]
        );

        list.assert_async().await;
        create.assert_async().await;
        for m in uploads {
            m.assert_async().await;
        }
        Ok(())
    }

    #[tokio::test]
    async fn reuses_existing_folder() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &["only.txt"]);

        let list = mock_list(
            &mut server,
            r#"{"files": [{"id": "existing", "name": "BackupFolderPC", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )
        .await;
        let create = mock_create(&mut server, 0).await;
        let upload = mock_upload(&mut server, "only.txt", "existing", 200).await;

        let mut out = Vec::new();
        let outcome = run(&f.drive, &f.settings, &mut out).await?;

        assert!(matches!(outcome, Outcome::Completed(ref r) if r.folder_id == "existing"));
        assert_eq!(lines(out), vec!["Backed up file: only.txt"]);
        list.assert_async().await;
        create.assert_async().await;
        upload.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn upload_failure_stops_the_run_with_one_error_line() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &["a.txt", "b.txt", "c.txt"]);

        let _list = mock_list(
            &mut server,
            r#"{"files": [{"id": "existing", "name": "BackupFolderPC", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )
        .await;
        let a = mock_upload(&mut server, "a.txt", "existing", 200).await;
        let b = mock_upload(&mut server, "b.txt", "existing", 500).await;
        let c = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex(r#""name":"c\.txt""#.into()))
            .expect(0)
            .create_async()
            .await;

        let mut out = Vec::new();
        let outcome = run(&f.drive, &f.settings, &mut out).await?;

        assert!(matches!(outcome, Outcome::Failed));
        let lines = lines(out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Backed up file: a.txt");
        assert!(lines[1].starts_with("Error: "), "got {:?}", lines[1]);
        assert!(lines[1].contains("Internal Error"));

        a.assert_async().await;
        b.assert_async().await;
        c.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_before_any_upload() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &["a.txt"]);

        let _list = server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut out = Vec::new();
        let outcome = run(&f.drive, &f.settings, &mut out).await?;

        assert!(matches!(outcome, Outcome::Failed));
        assert_eq!(
            lines(out),
            vec!["Error: GoogleAPIError 401 Unauthorized: Invalid Credentials"]
        );
        upload.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn subdirectories_are_skipped() -> anyhow::Result<()> {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &["a.txt"]);
        std::fs::create_dir(f.settings.source_dir.join("nested"))?;

        let _list = mock_list(
            &mut server,
            r#"{"files": [{"id": "existing", "name": "BackupFolderPC", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )
        .await;
        let upload = mock_upload(&mut server, "a.txt", "existing", 200).await;

        let mut out = Vec::new();
        let report = match run(&f.drive, &f.settings, &mut out).await? {
            Outcome::Completed(r) => r,
            Outcome::Failed => panic!("backup failed"),
        };

        assert_eq!(report.uploaded, vec!["a.txt"]);
        assert_eq!(report.skipped, vec!["nested"]);
        assert_eq!(lines(out), vec!["Backed up file: a.txt"]);
        upload.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_dir_is_not_caught() {
        let mut server = Server::new_async().await;
        let f = fixture(&server, &[]);
        std::fs::remove_dir(&f.settings.source_dir).unwrap();

        let _list = mock_list(
            &mut server,
            r#"{"files": [{"id": "existing", "name": "BackupFolderPC", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )
        .await;

        let mut out = Vec::new();
        let err = run(&f.drive, &f.settings, &mut out).await.unwrap_err();

        assert!(err.to_string().contains("Could not read directory"));
        assert!(out.is_empty());
    }
}
