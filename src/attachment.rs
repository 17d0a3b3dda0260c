//! File attachments for the upload endpoint.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extensions offered by the file picker. Not enforced on submit.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".txt", ".md"];

/// A file selected for the next submission, held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// Build an attachment from raw bytes, guessing the MIME type from the name.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Attachment {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let attachment = Self::from_bytes(file_name, bytes);
        tracing::debug!(
            name: "attachment.loaded",
            file = %attachment.file_name,
            content_type = %attachment.content_type,
            size = attachment.size(),
            "Attachment loaded"
        );
        Ok(attachment)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Convert into a multipart `file` part.
    pub fn into_part(self) -> Result<reqwest::multipart::Part> {
        let part = reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        Ok(part)
    }
}

/// Whether the file picker would offer `path` given the accepted extensions.
pub fn is_accepted(path: &Path, accepted: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = format!(".{}", ext.to_ascii_lowercase());
    accepted
        .iter()
        .any(|a| a.to_ascii_lowercase() == ext)
}

/// Expand a leading `~/` in a user-typed path.
pub fn expand_home(input: &str) -> PathBuf {
    match (input.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn accepted() -> Vec<String> {
        ACCEPTED_EXTENSIONS.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_accepted_extensions() {
        let accepted = accepted();
        assert!(is_accepted(Path::new("notes.md"), &accepted));
        assert!(is_accepted(Path::new("/tmp/Report.PDF"), &accepted));
        assert!(is_accepted(Path::new("brief.docx"), &accepted));
        assert!(!is_accepted(Path::new("photo.png"), &accepted));
        assert!(!is_accepted(Path::new("Makefile"), &accepted));
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(
            Attachment::from_bytes("a.pdf", vec![]).content_type(),
            "application/pdf"
        );
        assert_eq!(
            Attachment::from_bytes("a.txt", vec![]).content_type(),
            "text/plain"
        );
        assert_eq!(
            Attachment::from_bytes("blob", vec![]).content_type(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"mayor election notes").unwrap();

        let attachment = Attachment::load(file.path()).await.unwrap();
        assert_eq!(attachment.bytes(), b"mayor election notes");
        assert_eq!(attachment.size(), 20);
        assert!(attachment.file_name().ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Attachment::load("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, Error::Attachment { .. }));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("docs/a.md"), PathBuf::from("docs/a.md"));
    }
}
