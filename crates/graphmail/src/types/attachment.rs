//! Attachment model.

use crate::error::Result;
use bytes::Bytes;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// Fallback content type when none is given.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Where an attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentData {
    /// In-memory payload.
    Bytes(Bytes),
    /// File read lazily at upload time.
    File(PathBuf),
}

/// A file attached to an outbound email.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename shown to recipients.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// Content id for inline references (`cid:`).
    pub content_id: Option<String>,
    /// Whether the attachment is rendered inline.
    pub is_inline: bool,
    len: u64,
    data: AttachmentData,
}

impl Attachment {
    /// Creates an attachment from an in-memory payload.
    #[must_use]
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            filename: filename.into(),
            content_type: normalize_content_type(content_type.into()),
            content_id: None,
            is_inline: false,
            len: data.len() as u64,
            data: AttachmentData::Bytes(data),
        }
    }

    /// Creates an attachment backed by a file.
    ///
    /// The file length is captured now; the contents are read during the
    /// send.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub async fn from_file(
        path: impl AsRef<Path>,
        content_type: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self {
            filename,
            content_type: normalize_content_type(content_type.into()),
            content_id: None,
            is_inline: false,
            len: metadata.len(),
            data: AttachmentData::File(path.to_path_buf()),
        })
    }

    /// Sets the content id.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Marks the attachment as inline.
    #[must_use]
    pub const fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the payload source.
    #[must_use]
    pub const fn data(&self) -> &AttachmentData {
        &self.data
    }

    /// Opens a fresh reader over the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing file cannot be opened.
    pub async fn open(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        match &self.data {
            AttachmentData::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            AttachmentData::File(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        }
    }
}

fn normalize_content_type(content_type: String) -> String {
    if content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        content_type
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_from_bytes() {
        let attachment = Attachment::from_bytes("a.txt", "text/plain", "hello".as_bytes().to_vec());
        assert_eq!(attachment.len(), 5);
        assert!(!attachment.is_empty());
        assert!(!attachment.is_inline);
        assert!(attachment.content_id.is_none());
    }

    #[test]
    fn test_default_content_type() {
        let attachment = Attachment::from_bytes("a.bin", "", Bytes::from_static(b"x"));
        assert_eq!(attachment.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_inline_with_content_id() {
        let attachment = Attachment::from_bytes("logo.png", "image/png", Bytes::from_static(b"png"))
            .with_content_id("logo")
            .inline();
        assert!(attachment.is_inline);
        assert_eq!(attachment.content_id.as_deref(), Some("logo"));
    }

    #[tokio::test]
    async fn test_open_bytes_twice() {
        let attachment = Attachment::from_bytes("a.txt", "text/plain", Bytes::from_static(b"abc"));

        for _ in 0..2 {
            let mut reader = attachment.open().await.unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).await.unwrap();
            assert_eq!(out, b"abc");
        }
    }

    #[tokio::test]
    async fn test_from_file() {
        let path = std::env::temp_dir().join(format!("graphmail-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"file body").await.unwrap();

        let attachment = Attachment::from_file(&path, "text/plain").await.unwrap();
        assert_eq!(attachment.len(), 9);
        assert_eq!(
            attachment.filename,
            path.file_name().unwrap().to_string_lossy()
        );

        let mut reader = attachment.open().await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"file body");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        assert!(
            Attachment::from_file("/definitely/not/here.bin", "application/pdf")
                .await
                .is_err()
        );
    }
}
