//! Blob storage for uploaded file bytes

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Byte storage addressed by storage name
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Location of the blob stored under `storage_name`
    fn path(&self, storage_name: &str) -> PathBuf;

    /// Create or replace a blob
    async fn write(&self, storage_name: &str, data: &[u8]) -> io::Result<()>;

    /// Read a blob; fails with `NotFound` if it does not exist
    async fn read(&self, storage_name: &str) -> io::Result<Bytes>;

    /// Delete a blob; succeeds if it is already absent
    async fn delete(&self, storage_name: &str) -> io::Result<()>;
}

/// Blob store rooted at a local directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the upload directory exists
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!(upload_root = ?self.root, "Blob store initialized");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn path(&self, storage_name: &str) -> PathBuf {
        self.root.join(storage_name)
    }

    async fn write(&self, storage_name: &str, data: &[u8]) -> io::Result<()> {
        // Idempotent; the directory may have been removed since startup
        fs::create_dir_all(&self.root).await?;
        fs::write(self.path(storage_name), data).await?;
        debug!(storage_name, size = data.len(), "Wrote blob");
        Ok(())
    }

    async fn read(&self, storage_name: &str) -> io::Result<Bytes> {
        let data = fs::read(self.path(storage_name)).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, storage_name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(storage_name)).await {
            Ok(()) => {
                debug!(storage_name, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(storage_name, "Blob already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
