//! Startup population of the content cache
//!
//! All metadata records are split into fixed-size batches and each batch is
//! loaded by its own tokio task. The whole run is detached from request
//! handling: downloads that arrive before a file is warmed fall back to the
//! read-through loader.

use crate::blob::BlobStore;
use crate::metadata::MetadataStore;
use content_cache::ContentCache;
use fileserver_db::FileRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Outcome of a warm-up run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmupReport {
    /// Records returned by the metadata store
    pub records: usize,
    /// Size of each batch, in the order the batches were formed
    pub batches: Vec<usize>,
    pub loaded: usize,
    pub failed: usize,
    /// Read, but not cached because a removal overlapped the read
    pub skipped: usize,
    /// Bytes put into the cache
    pub total_bytes: u64,
}

#[derive(Debug, Default)]
struct BatchOutcome {
    loaded: usize,
    failed: usize,
    skipped: usize,
    bytes: u64,
}

pub struct WarmupLoader {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    cache: ContentCache,
    batch_size: usize,
}

impl WarmupLoader {
    /// A batch size of zero is treated as one
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: ContentCache,
        batch_size: usize,
    ) -> Self {
        Self {
            metadata,
            blobs,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Load every stored file into the cache and wait for all batches
    pub async fn run(&self) -> WarmupReport {
        let started = Instant::now();

        let records = match self.metadata.find_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Cache warm-up could not list file records");
                return WarmupReport::default();
            }
        };

        let mut report = WarmupReport {
            records: records.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            report.batches.push(batch.len());
            tasks.spawn(load_batch(
                index,
                batch.to_vec(),
                Arc::clone(&self.blobs),
                self.cache.clone(),
            ));
        }

        info!(
            records = report.records,
            batches = report.batches.len(),
            batch_size = self.batch_size,
            "Cache warm-up started"
        );

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.loaded += outcome.loaded;
                    report.failed += outcome.failed;
                    report.skipped += outcome.skipped;
                    report.total_bytes += outcome.bytes;
                }
                Err(e) => error!(error = %e, "Cache warm-up batch task failed"),
            }
        }

        info!(
            loaded = report.loaded,
            failed = report.failed,
            skipped = report.skipped,
            total_bytes = report.total_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache warm-up finished"
        );

        report
    }

    /// Run the warm-up on a detached task.
    ///
    /// The returned handle may be dropped; the warm-up keeps running.
    pub fn spawn(self) -> WarmupHandle {
        WarmupHandle {
            inner: tokio::spawn(async move { self.run().await }),
        }
    }
}

/// Completion signal for a spawned warm-up. Never used to gate requests.
pub struct WarmupHandle {
    inner: JoinHandle<WarmupReport>,
}

impl WarmupHandle {
    /// Wait for the warm-up to finish
    pub async fn finished(self) -> Option<WarmupReport> {
        match self.inner.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Cache warm-up task failed");
                None
            }
        }
    }
}

/// Read each blob of a batch in turn; a failed read is logged and skipped
async fn load_batch(
    index: usize,
    batch: Vec<FileRecord>,
    blobs: Arc<dyn BlobStore>,
    cache: ContentCache,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for record in batch {
        // A delete landing after this point voids the fill
        let ticket = cache.ticket();
        match blobs.read(&record.storage_name).await {
            Ok(data) => {
                let size = data.len() as u64;
                if cache.fill(record.storage_name, data, ticket).await {
                    outcome.loaded += 1;
                    outcome.bytes += size;
                } else {
                    outcome.skipped += 1;
                }
            }
            Err(e) => {
                outcome.failed += 1;
                warn!(
                    batch = index,
                    storage_name = %record.storage_name,
                    path = ?blobs.path(&record.storage_name),
                    error = %e,
                    "Skipping file during cache warm-up"
                );
            }
        }
    }

    debug!(
        batch = index,
        loaded = outcome.loaded,
        failed = outcome.failed,
        "Warm-up batch done"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MemoryMetadataStore;
    use crate::testing::{seed_file, CountingMetadataStore, InstrumentedBlobStore};
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_warmup_25_records_in_batches_of_10() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));

        let mut expected_bytes = 0u64;
        for i in 0..25 {
            let data = vec![b'x'; i + 1];
            expected_bytes += data.len() as u64;
            seed_file(metadata.as_ref(), blobs.as_ref(), &format!("f{i}.bin"), &data).await;
        }

        let cache = ContentCache::new();
        let loader = WarmupLoader::new(metadata, blobs.clone(), cache.clone(), 10);
        let report = loader.run().await;

        assert_eq!(report.records, 25);
        assert_eq!(report.batches, vec![10, 10, 5]);
        assert_eq!(report.loaded, 25);
        assert_eq!(report.failed, 0);
        assert_eq!(report.total_bytes, expected_bytes);

        assert_eq!(cache.size().await, 25);
        assert_eq!(cache.total_bytes().await, expected_bytes);
        assert_eq!(blobs.reads(), 25);
    }

    #[tokio::test]
    async fn test_warmup_skips_unreadable_blob() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));

        seed_file(metadata.as_ref(), blobs.as_ref(), "a.bin", b"aaa").await;
        seed_file(metadata.as_ref(), blobs.as_ref(), "gone.bin", b"bbb").await;
        seed_file(metadata.as_ref(), blobs.as_ref(), "c.bin", b"ccc").await;
        blobs.delete("gone.bin").await.unwrap();

        let cache = ContentCache::new();
        let report = WarmupLoader::new(metadata, blobs, cache.clone(), 2)
            .run()
            .await;

        assert_eq!(report.batches, vec![2, 1]);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed, 1);
        assert!(cache.get("a.bin").await.is_some());
        assert!(cache.get("gone.bin").await.is_none());
        assert!(cache.get("c.bin").await.is_some());
    }

    #[tokio::test]
    async fn test_warmup_with_no_records() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(CountingMetadataStore::default());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));

        let cache = ContentCache::new();
        let report = WarmupLoader::new(metadata.clone(), blobs, cache.clone(), 10)
            .run()
            .await;

        assert_eq!(report, WarmupReport::default());
        assert_eq!(cache.size().await, 0);
        assert_eq!(metadata.listings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warmup_listing_failure_loads_nothing() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(CountingMetadataStore::default());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));
        seed_file(metadata.as_ref(), blobs.as_ref(), "a.bin", b"a").await;
        metadata.fail_listings.store(true, Ordering::SeqCst);

        let cache = ContentCache::new();
        let report = WarmupLoader::new(metadata, blobs.clone(), cache.clone(), 10)
            .run()
            .await;

        assert_eq!(report, WarmupReport::default());
        assert_eq!(cache.size().await, 0);
        assert_eq!(blobs.reads(), 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_clamped() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));
        seed_file(metadata.as_ref(), blobs.as_ref(), "a.bin", b"a").await;
        seed_file(metadata.as_ref(), blobs.as_ref(), "b.bin", b"b").await;

        let loader = WarmupLoader::new(metadata, blobs, ContentCache::new(), 0);
        assert_eq!(loader.batch_size(), 1);
        assert_eq!(loader.run().await.batches, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_spawned_warmup_reports_completion() {
        let dir = tempdir().unwrap();
        let metadata = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(InstrumentedBlobStore::new(dir.path()));
        for i in 0..12 {
            seed_file(metadata.as_ref(), blobs.as_ref(), &format!("{i}.bin"), b"data").await;
        }

        let cache = ContentCache::new();
        let handle = WarmupLoader::new(metadata, blobs, cache.clone(), DEFAULT_BATCH_SIZE).spawn();

        let report = handle.finished().await.unwrap();
        assert_eq!(report.batches, vec![10, 2]);
        assert_eq!(cache.size().await, 12);
        assert_eq!(cache.total_bytes().await, 48);
    }
}
