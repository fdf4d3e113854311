use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File exceeds maximum upload size of {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Directory incoming uploads are spooled to before reaching the backend.
pub struct StagingArea {
    dir: PathBuf,
    max_bytes: u64,
}

impl StagingArea {
    /// Uses the system temp directory when `dir` is `None`.
    pub fn new(dir: Option<&Path>, max_bytes: u64) -> Result<Self, std::io::Error> {
        let dir = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.to_path_buf()
            }
            None => std::env::temp_dir(),
        };
        Ok(Self { dir, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Open a new temp file for an incoming upload.
    pub fn begin(
        &self,
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<StagingWriter, StagingError> {
        let temp = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.dir)?;
        let out = tokio::fs::File::from_std(temp.reopen()?);

        Ok(StagingWriter {
            temp,
            out,
            written: 0,
            max_bytes: self.max_bytes,
            file_name,
            content_type,
        })
    }
}

/// An upload being written to disk. Dropping it removes the temp file.
pub struct StagingWriter {
    temp: NamedTempFile,
    out: tokio::fs::File,
    written: u64,
    max_bytes: u64,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl StagingWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StagingError> {
        self.written += chunk.len() as u64;
        if self.written > self.max_bytes {
            return Err(StagingError::TooLarge {
                limit: self.max_bytes,
            });
        }
        self.out.write_all(chunk).await?;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StagedUpload, StagingError> {
        self.out.flush().await?;
        self.out.sync_all().await?;

        let content_type = resolve_content_type(self.content_type, self.file_name.as_deref());
        Ok(StagedUpload {
            temp: self.temp,
            file_name: self.file_name.unwrap_or_else(|| "image".to_string()),
            content_type,
            byte_size: self.written,
        })
    }
}

/// A fully received upload sitting in a temp file.
pub struct StagedUpload {
    temp: NamedTempFile,
    pub file_name: String,
    pub content_type: String,
    pub byte_size: u64,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub async fn read(&self) -> Result<Bytes, std::io::Error> {
        Ok(Bytes::from(tokio::fs::read(self.temp.path()).await?))
    }

    /// Remove the temp file now.
    pub fn discard(self) {
        let path = self.temp.path().to_path_buf();
        if let Err(e) = self.temp.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

/// MIME type from the multipart Content-Type, or guessed from the filename, or a fallback.
pub fn resolve_content_type(declared: Option<String>, file_name: Option<&str>) -> String {
    declared
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            file_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(
            resolve_content_type(Some("image/png".into()), Some("a.jpg")),
            "image/png"
        );
        assert_eq!(
            resolve_content_type(Some("application/octet-stream".into()), Some("a.jpg")),
            "image/jpeg"
        );
        assert_eq!(resolve_content_type(None, Some("a.webp")), "image/webp");
        assert_eq!(resolve_content_type(None, None), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_stage_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(Some(dir.path()), 1024).unwrap();

        let mut writer = area
            .begin(Some("cut.png".into()), Some("image/png".into()))
            .unwrap();
        writer.write_chunk(b"hello ").await.unwrap();
        writer.write_chunk(b"world").await.unwrap();
        let staged = writer.finish().await.unwrap();

        assert_eq!(staged.byte_size, 11);
        assert_eq!(staged.file_name, "cut.png");
        assert_eq!(staged.read().await.unwrap(), Bytes::from("hello world"));

        let path = staged.path().to_path_buf();
        assert!(path.exists());
        staged.discard();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(Some(dir.path()), 8).unwrap();

        let mut writer = area.begin(None, None).unwrap();
        writer.write_chunk(b"12345").await.unwrap();
        let err = writer.write_chunk(b"67890").await.unwrap_err();
        assert!(matches!(err, StagingError::TooLarge { limit: 8 }));

        drop(writer);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
