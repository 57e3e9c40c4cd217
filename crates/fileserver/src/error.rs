//! Error types for the file server

use std::fmt;

#[derive(Debug)]
pub enum FileServerError {
    /// Rejected input, e.g. an empty payload or an unusable file name
    Validation(String),
    /// Unknown storage name, or a record whose blob is gone
    NotFound(String),
    /// Blob read/write/delete failure
    StorageIo(Box<std::io::Error>),
    /// Metadata persistence failure
    Database(Box<sqlx::Error>),
    /// Storage name already taken in the metadata store
    Conflict(String),
    Config(String),
}

impl fmt::Display for FileServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileServerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            FileServerError::NotFound(name) => write!(f, "File not found: {}", name),
            FileServerError::StorageIo(err) => write!(f, "Storage IO error: {}", err),
            FileServerError::Database(err) => write!(f, "Database error: {}", err),
            FileServerError::Conflict(name) => write!(f, "Storage name already exists: {}", name),
            FileServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for FileServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileServerError::StorageIo(err) => Some(err.as_ref()),
            FileServerError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FileServerError {
    fn from(err: std::io::Error) -> Self {
        FileServerError::StorageIo(Box::new(err))
    }
}

impl From<sqlx::Error> for FileServerError {
    fn from(err: sqlx::Error) -> Self {
        FileServerError::Database(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for FileServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        FileServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FileServerError>;
