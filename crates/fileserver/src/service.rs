//! Upload, download, delete and list operations over the cache and stores

use crate::blob::BlobStore;
use crate::consistency::{ConsistencyController, UploadCachePolicy};
use crate::error::{FileServerError, Result};
use crate::metadata::MetadataStore;
use crate::read_through::ReadThroughLoader;
use crate::types::UploadResponse;
use crate::warmup::WarmupLoader;
use bytes::Bytes;
use content_cache::{CacheStats, ContentCache};
use fileserver_db::NewFileRecord;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DOWNLOAD_PATH: &str = "/api/fileserver/download";

/// Where the bytes returned by a download came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Storage,
}

pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    cache: ContentCache,
    consistency: ConsistencyController,
    loader: ReadThroughLoader,
    /// Prefix for download URLs; empty yields relative URLs
    public_url: String,
}

impl FileService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: ContentCache,
        policy: UploadCachePolicy,
        public_url: impl Into<String>,
    ) -> Self {
        let loader = ReadThroughLoader::new(
            Arc::clone(&metadata),
            Arc::clone(&blobs),
            cache.clone(),
        );
        Self {
            metadata,
            blobs,
            consistency: ConsistencyController::new(cache.clone(), policy),
            cache,
            loader,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Warm-up loader sharing this service's stores and cache
    pub fn warmup_loader(&self, batch_size: usize) -> WarmupLoader {
        WarmupLoader::new(
            Arc::clone(&self.metadata),
            Arc::clone(&self.blobs),
            self.cache.clone(),
            batch_size,
        )
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Store a new file under a generated storage name
    pub async fn upload(&self, file_name: &str, data: Bytes) -> Result<UploadResponse> {
        if data.is_empty() {
            return Err(FileServerError::Validation("Empty file".to_string()));
        }
        if file_name.trim().is_empty() {
            return Err(FileServerError::Validation("Missing file name".to_string()));
        }

        let extension = file_extension(file_name)?;
        let storage_name = storage_name_for(&extension);

        let record = self
            .metadata
            .insert(NewFileRecord {
                file_name: file_name.to_string(),
                storage_name: storage_name.clone(),
                extension,
            })
            .await?;

        if let Err(e) = self.blobs.write(&storage_name, &data).await {
            error!(
                storage_name = %storage_name,
                path = ?self.blobs.path(&storage_name),
                error = %e,
                "Failed to write blob, removing file record"
            );
            // Keep the metadata store free of records without bytes
            if let Err(cleanup) = self.metadata.delete(&record).await {
                error!(
                    storage_name = %storage_name,
                    error = %cleanup,
                    "Failed to remove file record after blob write failure"
                );
            }
            return Err(e.into());
        }

        self.consistency.on_upload(&storage_name, data.clone()).await;

        info!(
            file_name,
            storage_name = %storage_name,
            size = data.len(),
            "Uploaded file"
        );

        Ok(UploadResponse {
            download_url: format!("{}{}/{}", self.public_url, DOWNLOAD_PATH, storage_name),
            file_name: storage_name,
        })
    }

    /// File contents by storage name
    pub async fn download(&self, storage_name: &str) -> Result<Bytes> {
        self.fetch(storage_name).await.map(|(data, _)| data)
    }

    /// File contents plus whether they were served from the cache
    pub async fn fetch(&self, storage_name: &str) -> Result<(Bytes, Source)> {
        // Hits are returned as-is; blobs never change once written
        if let Some(data) = self.cache.get(storage_name).await {
            return Ok((data, Source::Cache));
        }

        let data = self.loader.load(storage_name).await?;
        Ok((data, Source::Storage))
    }

    /// Remove a file's bytes, record and cache entry.
    ///
    /// The blob goes first. If it cannot be deleted for any reason other than
    /// already being gone, the record is left in place and the error returned.
    pub async fn delete(&self, storage_name: &str) -> Result<()> {
        let record = self
            .metadata
            .find_by_storage_name(storage_name)
            .await?
            .ok_or_else(|| FileServerError::NotFound(storage_name.to_string()))?;

        if let Err(e) = self.blobs.delete(&record.storage_name).await {
            warn!(
                storage_name,
                path = ?self.blobs.path(&record.storage_name),
                error = %e,
                "Failed to delete blob, keeping file record"
            );
            return Err(e.into());
        }

        self.metadata.delete(&record).await?;
        self.consistency.on_delete(&record.storage_name).await;

        info!(storage_name, "Deleted file");
        Ok(())
    }

    /// Storage names of all files, oldest first
    pub async fn list(&self) -> Result<Vec<String>> {
        let records = self.metadata.find_all().await?;
        Ok(records.into_iter().map(|r| r.storage_name).collect())
    }
}

/// Extension of an uploaded file name: the text after its last `.`.
///
/// A name without a `.` (or ending in one) has an empty extension. Extensions
/// end up in on-disk paths, so only ASCII alphanumerics, `-` and `_` pass.
pub fn file_extension(file_name: &str) -> Result<String> {
    let extension = match file_name.rfind('.') {
        Some(idx) => &file_name[idx + 1..],
        None => "",
    };

    if !extension
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FileServerError::Validation(format!(
            "Unsupported file extension: {}",
            extension
        )));
    }

    Ok(extension.to_string())
}

/// Fresh, globally unique storage name carrying `extension`
pub fn storage_name_for(extension: &str) -> String {
    let id = Uuid::new_v4();
    if extension.is_empty() {
        id.to_string()
    } else {
        format!("{}.{}", id, extension)
    }
}
