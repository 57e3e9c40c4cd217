//! File server - uploads, downloads and deletes files, serving them from a
//! warm in-memory cache where possible.

use content_cache::ContentCache;
use fileserver::{
    start_server, FileServerConfig, FileServerError, FileService, FsBlobStore,
    MemoryMetadataStore, MetadataStore, PgMetadataStore, Result, ServerState, SharedState,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("fileserver=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting file server...");

    let config = FileServerConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Upload path: {:?}", config.upload_path);
    info!("Upload cache policy: {}", config.upload_cache_policy);
    info!("Warm-up batch size: {}", config.warmup_batch_size);

    let metadata: Arc<dyn MetadataStore> = match &config.database_url {
        Some(url) => {
            let store = PgMetadataStore::connect(url).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, file metadata is kept in memory only");
            Arc::new(MemoryMetadataStore::new())
        }
    };

    let blobs = FsBlobStore::new(&config.upload_path);
    blobs.init().await?;

    let service = FileService::new(
        metadata,
        Arc::new(blobs),
        ContentCache::new(),
        config.upload_cache_policy,
        config.public_url.clone(),
    );

    // Detached: requests are served from the first moment, warm or not
    let _warmup = service.warmup_loader(config.warmup_batch_size).spawn();

    let state: SharedState = Arc::new(ServerState::new(service));

    // Start HTTP server (blocking)
    start_server(state, config.port, config.max_upload_bytes)
        .await
        .map_err(|e| FileServerError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
