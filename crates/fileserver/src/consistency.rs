//! Keeps the content cache in step with uploads and deletes

use crate::error::FileServerError;
use bytes::Bytes;
use content_cache::ContentCache;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What an upload does to the cache once the file is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadCachePolicy {
    /// Insert only the uploaded file
    #[default]
    Insert,
    /// Empty the whole cache; other files reload on their next download
    ClearAll,
}

impl FromStr for UploadCachePolicy {
    type Err = FileServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(UploadCachePolicy::Insert),
            "clear" | "clear-all" | "clear_all" => Ok(UploadCachePolicy::ClearAll),
            other => Err(FileServerError::Config(format!(
                "Unknown upload cache policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for UploadCachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadCachePolicy::Insert => write!(f, "insert"),
            UploadCachePolicy::ClearAll => write!(f, "clear"),
        }
    }
}

pub struct ConsistencyController {
    cache: ContentCache,
    policy: UploadCachePolicy,
}

impl ConsistencyController {
    pub fn new(cache: ContentCache, policy: UploadCachePolicy) -> Self {
        Self { cache, policy }
    }

    /// Call after the record is persisted and the blob written
    pub async fn on_upload(&self, storage_name: &str, data: Bytes) {
        match self.policy {
            UploadCachePolicy::Insert => self.cache.put(storage_name, data).await,
            UploadCachePolicy::ClearAll => {
                debug!(storage_name, "Clearing content cache after upload");
                self.cache.clear().await;
            }
        }
    }

    /// Call after the blob and record are deleted
    pub async fn on_delete(&self, storage_name: &str) {
        self.cache.remove(storage_name).await;
    }
}
