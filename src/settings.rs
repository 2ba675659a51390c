use std::path::PathBuf;

pub const CLIENT_SECRET_FILE: &str = "credentials.json";
pub const TOKEN_FILE: &str = "token.json";
pub const SOURCE_DIR: &str = "FOLDER_PATH";
pub const FOLDER_NAME: &str = "BackupFolderPC";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Where a backup run reads its credentials and files from, and where it puts them.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub source_dir: PathBuf,
    pub folder_name: String,
    pub scopes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_secret_path: PathBuf::from(CLIENT_SECRET_FILE),
            token_path: PathBuf::from(TOKEN_FILE),
            source_dir: PathBuf::from(SOURCE_DIR),
            folder_name: FOLDER_NAME.to_string(),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }
}

impl Settings {
    /// Builds the settings from the defaults, replacing each value whose
    /// environment variable is set.
    ///
    /// * `BACKITUP_CLIENT_SECRET` - path of the OAuth client secret file
    /// * `BACKITUP_TOKEN` - path of the persisted credential
    /// * `BACKITUP_SOURCE_DIR` - directory whose files are backed up
    /// * `BACKITUP_FOLDER_NAME` - name of the destination folder on Drive
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup("BACKITUP_CLIENT_SECRET") {
            settings.client_secret_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BACKITUP_TOKEN") {
            settings.token_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BACKITUP_SOURCE_DIR") {
            settings.source_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("BACKITUP_FOLDER_NAME") {
            settings.folder_name = v;
        }

        settings
    }
}
