//! Concurrent storage-name → bytes mapping backed by moka

use crate::types::CacheStats;
use bytes::Bytes;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared handle to the content cache.
///
/// Cloning is cheap and every clone sees the same entries, so one instance
/// can be handed to warm-up tasks and request handlers alike.
#[derive(Clone)]
pub struct ContentCache {
    entries: Cache<String, Bytes>,
    /// Cache hit counter
    hits: Arc<AtomicU64>,
    /// Cache miss counter
    misses: Arc<AtomicU64>,
    /// Bumped by every `remove` and `clear`, read by `ticket`/`fill`
    removals: Arc<AtomicU64>,
}

/// Snapshot of the removal counter taken before reading the bytes that a
/// later [`ContentCache::fill`] inserts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

impl ContentCache {
    /// Create an empty, unbounded cache
    pub fn new() -> Self {
        // Weighted by byte length so `total_bytes` is tracked by moka itself.
        // No max_capacity: growth is bounded only by the number of distinct files.
        let entries = Cache::builder()
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .build();

        Self {
            entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            removals: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Look up the bytes cached under `key`
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        match self.entries.get(key).await {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit");
                Some(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Insert or replace the bytes cached under `key`
    pub async fn put(&self, key: impl Into<String>, data: Bytes) {
        let key = key.into();
        let size = data.len();
        self.entries.insert(key.clone(), data).await;
        debug!(key = %key, size, "Cached content");
    }

    /// Take a ticket for a later `fill`. Must be taken before the backing
    /// store is read.
    pub fn ticket(&self) -> FillTicket {
        FillTicket(self.removals.load(Ordering::SeqCst))
    }

    /// Insert bytes read from a backing store, unless a `remove` or `clear`
    /// ran since `ticket` was taken.
    ///
    /// Any removal voids the ticket, not only one for `key`; a dropped fill
    /// costs the next reader one reload. Returns whether the entry was kept.
    pub async fn fill(&self, key: impl Into<String>, data: Bytes, ticket: FillTicket) -> bool {
        if self.removals.load(Ordering::SeqCst) != ticket.0 {
            debug!("Skipped stale cache fill");
            return false;
        }

        let key = key.into();
        self.entries.insert(key.clone(), data).await;

        // A removal that started before the insert landed may have missed it
        if self.removals.load(Ordering::SeqCst) != ticket.0 {
            self.entries.remove(&key).await;
            debug!(key = %key, "Dropped stale cache fill");
            return false;
        }
        true
    }

    /// Remove a single entry; a missing key is a no-op
    pub async fn remove(&self, key: &str) {
        self.removals.fetch_add(1, Ordering::SeqCst);
        if self.entries.remove(key).await.is_some() {
            debug!(key, "Removed cache entry");
        }
    }

    /// Drop every entry.
    ///
    /// Entries inserted before this call are never returned afterwards. A
    /// `put` racing with `clear` may or may not survive it.
    pub async fn clear(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        debug!("Cleared content cache");
    }

    /// Number of cached entries
    pub async fn size(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    /// Sum of the byte lengths of all cached entries.
    ///
    /// moka weighs entries as `u32`, so an entry larger than 4 GiB counts as
    /// `u32::MAX` bytes and the total under-reports.
    pub async fn total_bytes(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.weighted_size()
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks().await;
        CacheStats {
            entries: self.entries.entry_count(),
            total_size: self.entries.weighted_size(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}
