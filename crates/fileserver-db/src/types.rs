use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File metadata row returned from SELECT queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: i64,
    /// Name supplied by the uploader
    pub file_name: String,
    /// Generated name the bytes are stored and cached under
    pub storage_name: String,
    /// Extension without the leading dot; empty when the upload had none
    pub extension: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a file record
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub file_name: String,
    pub storage_name: String,
    pub extension: String,
}
