//! Synchronous cache fill on a download miss

use crate::blob::BlobStore;
use crate::error::{FileServerError, Result};
use crate::metadata::MetadataStore;
use bytes::Bytes;
use content_cache::ContentCache;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ReadThroughLoader {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    cache: ContentCache,
}

impl ReadThroughLoader {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: ContentCache,
    ) -> Self {
        Self {
            metadata,
            blobs,
            cache,
        }
    }

    /// Load a file from the backing stores and cache it.
    ///
    /// Fails with `NotFound` when there is no record, or when the record's
    /// blob is missing or unreadable.
    pub async fn load(&self, storage_name: &str) -> Result<Bytes> {
        // Taken before the lookup so a delete overlapping this load voids the fill
        let ticket = self.cache.ticket();

        let record = self
            .metadata
            .find_by_storage_name(storage_name)
            .await?
            .ok_or_else(|| FileServerError::NotFound(storage_name.to_string()))?;

        let data = match self.blobs.read(&record.storage_name).await {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    storage_name,
                    path = ?self.blobs.path(&record.storage_name),
                    error = %e,
                    "Unable to read blob for existing record"
                );
                return Err(FileServerError::NotFound(storage_name.to_string()));
            }
        };

        debug!(storage_name, size = data.len(), "Loaded file on cache miss");
        self.cache.fill(record.storage_name, data.clone(), ticket).await;
        Ok(data)
    }
}
