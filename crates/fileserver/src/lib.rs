//! File server library
//!
//! Upload, download, delete and list operations over a metadata store and a
//! blob directory, with an in-memory content cache warmed at startup.

pub mod blob;
pub mod config;
pub mod consistency;
pub mod error;
pub mod metadata;
pub mod read_through;
pub mod server;
pub mod service;
pub mod types;
pub mod warmup;

#[cfg(test)]
mod testing;

pub use blob::{BlobStore, FsBlobStore};
pub use config::FileServerConfig;
pub use consistency::UploadCachePolicy;
pub use error::{FileServerError, Result};
pub use metadata::{MemoryMetadataStore, MetadataStore, PgMetadataStore};
pub use server::{create_router, start_server, ServerState, SharedState};
pub use service::FileService;
pub use types::*;
pub use warmup::{WarmupHandle, WarmupLoader, WarmupReport};
