use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub path: PathBuf,
    pub file_type: FileType,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Dir,
    Unknown,
}

impl FileMeta {
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }
}

/// Outcome of a completed backup run.
#[derive(Debug, Clone)]
pub struct Report {
    pub folder_id: String,
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
}
