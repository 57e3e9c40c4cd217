//! HTTP server for the file endpoints
//!
//! Provides /health and the /api/fileserver upload, download, delete and
//! filenames endpoints.

use crate::error::FileServerError;
use crate::service::{FileService, Source};
use crate::types::{ErrorResponse, HealthResponse};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub service: FileService,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(service: FileService) -> Self {
        Self {
            service,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/fileserver/filenames", get(list_files))
        .route("/api/fileserver/upload", post(upload_file))
        .route("/api/fileserver/download/{file_name}", get(download_file))
        .route("/api/fileserver/delete/{file_name}", delete(delete_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    state: SharedState,
    port: u16,
    max_upload_bytes: usize,
) -> std::io::Result<()> {
    let router = create_router(state, max_upload_bytes);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.service.cache_stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// GET /api/fileserver/filenames
async fn list_files(State(state): State<SharedState>) -> Response {
    match state.service.list().await {
        Ok(names) => Json(names).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list files");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /api/fileserver/upload, multipart field `file`
async fn upload_file(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => upload = Some((file_name, content_type, data)),
                    Err(e) => {
                        warn!(error = %e, "Failed to read upload body");
                        return invalid_file();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed multipart request");
                return invalid_file();
            }
        }
    }

    let (file_name, content_type, data) = match upload {
        Some(upload) if !upload.2.is_empty() => upload,
        _ => return invalid_file(),
    };

    info!(
        file_name = %file_name,
        content_type = content_type.as_deref().unwrap_or("unknown"),
        size = data.len(),
        "Received upload"
    );

    match state.service.upload(&file_name, data).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(FileServerError::Validation(msg)) => {
            warn!(file_name = %file_name, reason = %msg, "Rejected upload");
            invalid_file()
        }
        Err(e) => {
            error!(file_name = %file_name, error = %e, "Upload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Unable to Upload file")),
            )
                .into_response()
        }
    }
}

fn invalid_file() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Invalid File")),
    )
        .into_response()
}

/// GET /api/fileserver/download/{file_name}
async fn download_file(
    State(state): State<SharedState>,
    Path(file_name): Path<String>,
) -> Response {
    match state.service.fetch(&file_name).await {
        Ok((data, source)) => {
            let cache_header = match source {
                Source::Cache => "HIT",
                Source::Storage => "MISS",
            };

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", file_name),
                )
                .header("X-Cache", cache_header)
                .body(Body::from(data))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(FileServerError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(file_name = %file_name, error = %e, "Download failed");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// DELETE /api/fileserver/delete/{file_name}
async fn delete_file(
    State(state): State<SharedState>,
    Path(file_name): Path<String>,
) -> StatusCode {
    match state.service.delete(&file_name).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(FileServerError::NotFound(_)) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!(file_name = %file_name, error = %e, "Delete failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
