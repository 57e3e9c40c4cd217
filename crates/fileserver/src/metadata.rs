//! File metadata stores
//!
//! `PgMetadataStore` delegates to the `fileserver-db` crate for SQL execution.
//! `MemoryMetadataStore` keeps records in process and is used when no
//! database is configured, and in tests.

use crate::error::{FileServerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use fileserver_db::{FileRecord, NewFileRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence of file metadata records
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record, returning it with id and creation time assigned
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord>;

    async fn find_by_storage_name(&self, storage_name: &str) -> Result<Option<FileRecord>>;

    /// All records in creation order
    async fn find_all(&self) -> Result<Vec<FileRecord>>;

    async fn delete(&self, record: &FileRecord) -> Result<()>;
}

/// PostgreSQL-backed metadata store
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("Database connection established");
        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        fileserver_db::migrate::migrate(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord> {
        debug!(storage_name = %record.storage_name, "Inserting file record");
        match fileserver_db::files::insert(&self.pool, &record).await {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(FileServerError::Conflict(record.storage_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_storage_name(&self, storage_name: &str) -> Result<Option<FileRecord>> {
        Ok(fileserver_db::files::find_by_storage_name(&self.pool, storage_name).await?)
    }

    async fn find_all(&self) -> Result<Vec<FileRecord>> {
        Ok(fileserver_db::files::list_all(&self.pool).await?)
    }

    async fn delete(&self, record: &FileRecord) -> Result<()> {
        debug!(storage_name = %record.storage_name, "Deleting file record");
        fileserver_db::files::delete(&self.pool, record.id).await?;
        Ok(())
    }
}

/// In-process metadata store; records are lost on restart
#[derive(Default)]
pub struct MemoryMetadataStore {
    /// Kept in insertion (= creation) order
    records: RwLock<Vec<FileRecord>>,
    next_id: AtomicI64,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.storage_name == record.storage_name)
        {
            return Err(FileServerError::Conflict(record.storage_name));
        }

        let row = FileRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            file_name: record.file_name,
            storage_name: record.storage_name,
            extension: record.extension,
            created_at: Utc::now(),
        };
        records.push(row.clone());
        Ok(row)
    }

    async fn find_by_storage_name(&self, storage_name: &str) -> Result<Option<FileRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.storage_name == storage_name)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<FileRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn delete(&self, record: &FileRecord) -> Result<()> {
        self.records.write().await.retain(|r| r.id != record.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(file_name: &str, storage_name: &str) -> NewFileRecord {
        NewFileRecord {
            file_name: file_name.to_string(),
            storage_name: storage_name.to_string(),
            extension: "txt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = MemoryMetadataStore::new();

        let first = store.insert(new_record("a.txt", "1.txt")).await.unwrap();
        let second = store.insert(new_record("b.txt", "2.txt")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.file_name, "b.txt");
        assert!(second.created_at >= first.created_at);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_storage_name() {
        let store = MemoryMetadataStore::new();
        store.insert(new_record("a.txt", "same.txt")).await.unwrap();

        let result = store.insert(new_record("b.txt", "same.txt")).await;
        assert!(matches!(result, Err(FileServerError::Conflict(_))));
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_storage_name() {
        let store = MemoryMetadataStore::new();
        store.insert(new_record("a.txt", "1.txt")).await.unwrap();

        let found = store.find_by_storage_name("1.txt").await.unwrap();
        assert_eq!(found.unwrap().file_name, "a.txt");
        assert!(store.find_by_storage_name("2.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_in_creation_order() {
        let store = MemoryMetadataStore::new();
        for name in ["c.txt", "a.txt", "b.txt"] {
            store.insert(new_record(name, name)).await.unwrap();
        }

        let names: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.storage_name)
            .collect();
        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_delete_removes_only_that_record() {
        let store = MemoryMetadataStore::new();
        let keep = store.insert(new_record("a.txt", "1.txt")).await.unwrap();
        let gone = store.insert(new_record("b.txt", "2.txt")).await.unwrap();

        store.delete(&gone).await.unwrap();

        assert!(store.find_by_storage_name("2.txt").await.unwrap().is_none());
        assert_eq!(store.find_all().await.unwrap(), vec![keep]);
    }
}
