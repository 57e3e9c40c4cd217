//! Instrumented stores shared by unit tests

use crate::blob::{BlobStore, FsBlobStore};
use crate::error::Result;
use crate::metadata::{MemoryMetadataStore, MetadataStore};
use async_trait::async_trait;
use bytes::Bytes;
use fileserver_db::{FileRecord, NewFileRecord};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// In-memory metadata store that counts lookups and can fail listings
#[derive(Default)]
pub struct CountingMetadataStore {
    inner: MemoryMetadataStore,
    pub lookups: AtomicUsize,
    pub listings: AtomicUsize,
    pub fail_listings: AtomicBool,
}

impl CountingMetadataStore {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for CountingMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord> {
        self.inner.insert(record).await
    }

    async fn find_by_storage_name(&self, storage_name: &str) -> Result<Option<FileRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_storage_name(storage_name).await
    }

    async fn find_all(&self) -> Result<Vec<FileRecord>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listings.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        self.inner.find_all().await
    }

    async fn delete(&self, record: &FileRecord) -> Result<()> {
        self.inner.delete(record).await
    }
}

/// Filesystem blob store that counts reads and can be told to fail
pub struct InstrumentedBlobStore {
    inner: FsBlobStore,
    pub reads: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl InstrumentedBlobStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsBlobStore::new(root),
            reads: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for InstrumentedBlobStore {
    fn path(&self, storage_name: &str) -> PathBuf {
        self.inner.path(storage_name)
    }

    async fn write(&self, storage_name: &str, data: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.inner.write(storage_name, data).await
    }

    async fn read(&self, storage_name: &str) -> io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(storage_name).await
    }

    async fn delete(&self, storage_name: &str) -> io::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        self.inner.delete(storage_name).await
    }
}

/// Filesystem blob store whose reads can be held open.
///
/// While closed, each read signals `read_done` once its bytes are in hand and
/// then waits for `open` before returning them.
pub struct GatedBlobStore {
    inner: FsBlobStore,
    gated: AtomicBool,
    pub read_done: Notify,
    release: Notify,
}

impl GatedBlobStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsBlobStore::new(root),
            gated: AtomicBool::new(false),
            read_done: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn close(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let a held read return; later reads pass straight through
    pub fn open(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }
}

#[async_trait]
impl BlobStore for GatedBlobStore {
    fn path(&self, storage_name: &str) -> PathBuf {
        self.inner.path(storage_name)
    }

    async fn write(&self, storage_name: &str, data: &[u8]) -> io::Result<()> {
        self.inner.write(storage_name, data).await
    }

    async fn read(&self, storage_name: &str) -> io::Result<Bytes> {
        let data = self.inner.read(storage_name).await;
        if self.gated.load(Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        data
    }

    async fn delete(&self, storage_name: &str) -> io::Result<()> {
        self.inner.delete(storage_name).await
    }
}

/// Persist a record and its blob directly, bypassing the service
pub async fn seed_file(
    metadata: &dyn MetadataStore,
    blobs: &dyn BlobStore,
    storage_name: &str,
    data: &[u8],
) -> FileRecord {
    let record = metadata
        .insert(NewFileRecord {
            file_name: format!("original-{storage_name}"),
            storage_name: storage_name.to_string(),
            extension: "bin".to_string(),
        })
        .await
        .unwrap();
    blobs.write(storage_name, data).await.unwrap();
    record
}
