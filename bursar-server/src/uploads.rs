//! Supporting-document storage on local disk
//!
//! Files are written into one shared directory under a fresh
//! `{uuid}{.ext}` name. Only the metadata row links a file to its
//! application.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use uuid::Uuid;

/// Accepted document MIME types
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Document is required")]
    Missing,

    #[error("Uploaded file exceeds configured size limit")]
    TooLarge { limit: u64 },

    #[error("Unsupported document format")]
    UnsupportedType { mime: String },

    #[error("failed to store document: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the caller sent something unacceptable, as opposed to a
    /// server-side write failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// A file received from a multipart request, not yet written anywhere
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Location of a file written by [`DocumentStore::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub storage_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check presence, size and type before anything touches the disk.
    pub fn validate<'f>(&self, file: Option<&'f IncomingFile>) -> Result<&'f IncomingFile, UploadError> {
        let file = file.ok_or(UploadError::Missing)?;
        if file.bytes.is_empty() {
            return Err(UploadError::Missing);
        }
        if file.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return Err(UploadError::UnsupportedType {
                mime: file.mime_type.clone(),
            });
        }
        Ok(file)
    }

    /// Write the file under a fresh unique name.
    pub async fn save(&self, file: &IncomingFile) -> Result<StoredFile, UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let storage_name = format!("{}{}", Uuid::new_v4(), extension_of(&file.original_name));
        let path = self.dir.join(&storage_name);
        tokio::fs::write(&path, &file.bytes).await?;

        tracing::debug!(file = %storage_name, bytes = file.size(), "document written");
        Ok(StoredFile { storage_name, path })
    }

    /// Best-effort removal of a written file whose metadata was not saved.
    pub async fn remove(&self, stored: &StoredFile) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            tracing::warn!(file = %stored.storage_name, error = %e, "failed to remove orphaned document");
        }
    }
}

/// `.ext` of the original file name, or "" when it has none usable.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str, bytes: &'static [u8]) -> IncomingFile {
        IncomingFile {
            original_name: name.into(),
            mime_type: mime.into(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn validate_order() {
        let store = DocumentStore::new("unused", 4);

        assert!(matches!(store.validate(None), Err(UploadError::Missing)));
        assert!(matches!(
            store.validate(Some(&file("a.pdf", "application/pdf", b"12345"))),
            Err(UploadError::TooLarge { limit: 4 })
        ));
        assert!(matches!(
            store.validate(Some(&file("a.exe", "application/x-msdownload", b"MZ"))),
            Err(UploadError::UnsupportedType { .. })
        ));
        assert!(store.validate(Some(&file("a.png", "image/png", b"png"))).is_ok());
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_of("cv.PDF"), ".pdf");
        assert_eq!(extension_of("transcript"), "");
        assert_eq!(extension_of("../../etc/passwd"), "");
        assert_eq!(extension_of("x.p/df"), "");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
    }

    #[tokio::test]
    async fn save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("docs"), 1024);

        let stored = store
            .save(&file("letter.docx", ALLOWED_MIME_TYPES[4], b"hello"))
            .await
            .unwrap();
        assert!(stored.storage_name.ends_with(".docx"));
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"hello");

        store.remove(&stored).await;
        assert!(!stored.path.exists());
    }
}
