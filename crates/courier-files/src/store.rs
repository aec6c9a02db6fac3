//! Read-only view over a single directory of downloadable files.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::format::format_size;
use crate::mime;

/// Characters left bare when encoding a file name into a URL path segment
/// (the RFC 3986 unreserved set).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a file name for use in a URL or a
/// `Content-Disposition` filename.
pub fn encode_component(name: &str) -> String {
    utf8_percent_encode(name, COMPONENT).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("path escapes the files directory: {0}")]
    OutsideRoot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Metadata for one downloadable file, in the wire shape the HTTP API
/// returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub size_formatted: String,
    /// Lowercased, dot-prefixed; empty when the name has no extension.
    pub extension: String,
    pub mime_type: String,
    pub download_url: String,
    pub last_modified: DateTime<Utc>,
}

/// The configured depot directory. All paths handed out are guaranteed to
/// resolve inside it.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every regular file directly under the root, sorted by name.
    /// Subdirectories and other entry kinds are skipped.
    pub async fn list(&self) -> Result<Vec<FileEntry>, FilesError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;

        while let Some(item) = dir.next_entry().await? {
            let meta = item.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    // Non-UTF-8 names cannot be addressed through the API.
                    tracing::debug!(name = ?raw, "Skipping non-UTF-8 file name");
                    continue;
                }
            };
            entries.push(self.entry_for(&name, &item.path(), &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Metadata for a single file by name.
    pub async fn metadata(&self, name: &str) -> Result<FileEntry, FilesError> {
        let path = self.resolve(name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_to_files_error(e, name))?;
        if !meta.is_file() {
            return Err(FilesError::NotAFile(name.to_string()));
        }
        Ok(self.entry_for(name, &path, &meta))
    }

    /// Open a file for streaming. Returns the handle and its metadata.
    pub async fn open(&self, name: &str) -> Result<(tokio::fs::File, FileEntry), FilesError> {
        let path = self.resolve(name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_to_files_error(e, name))?;
        if !meta.is_file() {
            return Err(FilesError::NotAFile(name.to_string()));
        }
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| io_to_files_error(e, name))?;
        Ok((file, self.entry_for(name, &path, &meta)))
    }

    /// Resolve `name` under the root, rejecting anything that lexically
    /// escapes it. Runs before any filesystem access so `..` escapes are
    /// refused even when the target does not exist.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FilesError> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return Err(FilesError::OutsideRoot(name.to_string()));
        }

        let mut resolved = self.root.clone();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                // ParentDir, RootDir, Prefix all point outside the depot.
                _ => return Err(FilesError::OutsideRoot(name.to_string())),
            }
        }
        Ok(resolved)
    }

    fn entry_for(&self, name: &str, path: &Path, meta: &std::fs::Metadata) -> FileEntry {
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        FileEntry {
            name: name.to_string(),
            size: meta.len(),
            size_formatted: format_size(meta.len()),
            extension: extension_of(name),
            mime_type: mime::detect(path),
            download_url: format!("/api/download/{}", encode_component(name)),
            last_modified: DateTime::<Utc>::from(modified),
        }
    }
}

fn io_to_files_error(err: std::io::Error, name: &str) -> FilesError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FilesError::NotFound(name.to_string())
    } else {
        FilesError::Io(err)
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), b"hello world").unwrap();
        std::fs::write(dir.path().join("alpha.json"), b"{}").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        std::fs::write(dir.path().join("subdir").join("nested.txt"), b"x").unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn list_returns_regular_files_sorted_by_name() {
        let (_dir, store) = seeded_store();
        let entries = store.list().await.unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.json", "beta.txt"]);
    }

    #[tokio::test]
    async fn list_skips_directories() {
        let (_dir, store) = seeded_store();
        let entries = store.list().await.unwrap();
        assert!(entries.iter().all(|e| e.name != "subdir"));
    }

    #[tokio::test]
    async fn list_on_missing_root_is_io_error() {
        let store = FileStore::new("/nonexistent/depot/path");
        assert!(matches!(store.list().await, Err(FilesError::Io(_))));
    }

    #[tokio::test]
    async fn metadata_shape() {
        let (_dir, store) = seeded_store();
        let entry = store.metadata("beta.txt").await.unwrap();

        assert_eq!(entry.name, "beta.txt");
        assert_eq!(entry.size, 11);
        assert_eq!(entry.size_formatted, "11 Bytes");
        assert_eq!(entry.extension, ".txt");
        assert_eq!(entry.download_url, "/api/download/beta.txt");
        assert!(entry.last_modified > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn metadata_serializes_camel_case() {
        let (_dir, store) = seeded_store();
        let entry = store.metadata("beta.txt").await.unwrap();
        let json = serde_json::to_value(&entry).unwrap();

        assert!(json.get("sizeFormatted").is_some());
        assert!(json.get("mimeType").is_some());
        assert!(json.get("downloadUrl").is_some());
        assert!(json.get("lastModified").is_some());
        assert!(json.get("size_formatted").is_none());
    }

    #[tokio::test]
    async fn metadata_missing_file_is_not_found() {
        let (_dir, store) = seeded_store();
        assert!(matches!(
            store.metadata("ghost.bin").await,
            Err(FilesError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn metadata_on_directory_is_not_a_file() {
        let (_dir, store) = seeded_store();
        assert!(matches!(
            store.metadata("subdir").await,
            Err(FilesError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn open_streams_existing_file() {
        let (_dir, store) = seeded_store();
        let (file, entry) = store.open("beta.txt").await.unwrap();
        assert_eq!(entry.size, 11);
        drop(file);
    }

    #[test]
    fn resolve_rejects_parent_traversal() {
        let store = FileStore::new("/depot");
        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(FilesError::OutsideRoot(_))
        ));
        assert!(matches!(
            store.resolve("nested/../../etc/passwd"),
            Err(FilesError::OutsideRoot(_))
        ));
    }

    #[test]
    fn resolve_rejects_absolute_paths() {
        let store = FileStore::new("/depot");
        assert!(matches!(
            store.resolve("/etc/passwd"),
            Err(FilesError::OutsideRoot(_))
        ));
    }

    #[test]
    fn resolve_rejects_escape_before_existence_check() {
        // The guard is lexical: a nonexistent escape is still refused.
        let store = FileStore::new("/depot");
        assert!(matches!(
            store.resolve("../no-such-file-anywhere"),
            Err(FilesError::OutsideRoot(_))
        ));
    }

    #[test]
    fn resolve_accepts_plain_names() {
        let store = FileStore::new("/depot");
        assert_eq!(
            store.resolve("report.pdf").unwrap(),
            PathBuf::from("/depot/report.pdf")
        );
    }

    #[test]
    fn extension_is_lowercased_and_dot_prefixed() {
        assert_eq!(extension_of("ARCHIVE.TAR.GZ"), ".gz");
        assert_eq!(extension_of("photo.JPeG"), ".jpeg");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
    }

    #[test]
    fn download_url_is_percent_encoded() {
        assert_eq!(encode_component("my file (1).txt"), "my%20file%20%281%29.txt");
        assert_eq!(encode_component("plain-name_1.txt"), "plain-name_1.txt");
    }
}
