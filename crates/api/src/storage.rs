//! Storage for uploaded image payloads.
//!
//! Only the opaque reference returned by [`ImageStorage::store`] is kept on
//! the image record; the bytes are never read back by the service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Uploaded file is not a PNG, JPEG, or WebP image")]
    UnsupportedFormat,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persists image bytes and hands back a reference to them.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store `bytes` and return the reference to record on the image.
    ///
    /// Fails with [`StorageError::UnsupportedFormat`] unless the payload
    /// sniffs as one of the accepted formats.
    async fn store(&self, bytes: &[u8]) -> Result<String, StorageError>;
}

/// File extension for an accepted upload, decided from its leading bytes.
pub fn sniff_extension(bytes: &[u8]) -> Result<&'static str, StorageError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("png"),
        Ok(ImageFormat::Jpeg) => Ok("jpg"),
        Ok(ImageFormat::WebP) => Ok("webp"),
        _ => Err(StorageError::UnsupportedFormat),
    }
}

/// Writes payloads to `<root>/images/<uuid>.<ext>` on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    root: PathBuf,
}

impl LocalImageStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let ext = sniff_extension(bytes)?;

        let dir = self.root.join("images");
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{ext}", uuid::Uuid::new_v4());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::debug!(file_name, size = bytes.len(), "Stored image payload");
        Ok(format!("images/{file_name}"))
    }
}
