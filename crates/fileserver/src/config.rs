use crate::consistency::UploadCachePolicy;
use crate::error::{FileServerError, Result};
use crate::warmup::DEFAULT_BATCH_SIZE;
use std::env;
use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for the file server
#[derive(Debug, Clone)]
pub struct FileServerConfig {
    pub port: u16,
    /// Directory holding uploaded file bytes
    pub upload_path: PathBuf,
    /// Unset means metadata lives in memory only
    pub database_url: Option<String>,
    pub warmup_batch_size: usize,
    pub upload_cache_policy: UploadCachePolicy,
    /// Prefix for download URLs
    pub public_url: String,
    pub max_upload_bytes: usize,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            upload_path: PathBuf::from("./uploads"),
            database_url: None,
            warmup_batch_size: DEFAULT_BATCH_SIZE,
            upload_cache_policy: UploadCachePolicy::default(),
            public_url: String::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl FileServerConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let upload_path = lookup("UPLOAD_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_path);

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());

        let warmup_batch_size = match lookup("WARMUP_BATCH_SIZE") {
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(FileServerError::Config(format!(
                        "WARMUP_BATCH_SIZE must be a positive integer, got {:?}",
                        s
                    )))
                }
            },
            None => defaults.warmup_batch_size,
        };

        let upload_cache_policy = match lookup("UPLOAD_CACHE_POLICY") {
            Some(s) => s.parse()?,
            None => defaults.upload_cache_policy,
        };

        let public_url = lookup("PUBLIC_URL").unwrap_or(defaults.public_url);

        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);

        Ok(Self {
            port,
            upload_path,
            database_url,
            warmup_batch_size,
            upload_cache_policy,
            public_url,
            max_upload_bytes,
        })
    }
}
