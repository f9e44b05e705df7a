//! File handlers for the HTTP API.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use super::{AppState, ClientIp};
use crate::file::{UploadDescriptor, DOWNLOAD_CHUNK_SIZE};
use crate::web::dto::{ApiResponse, FileListResponse};
use crate::web::error::ApiError;

/// Name of the multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request("File too large")
    } else {
        warn!("Failed to read multipart data: {}", e);
        ApiError::bad_request("Invalid multipart data")
    }
}

/// POST /upload - Upload a file.
///
/// Request body: multipart/form-data with a `file` field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadDescriptor>>, ApiError> {
    info!(client = %ip, "Starting file upload");

    let mut multipart = multipart.map_err(|e| {
        warn!(client = %ip, "Rejected upload body: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, content));
        break;
    }

    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    state.service.check_size(content.len() as u64).map_err(|e| {
        warn!(client = %ip, size = content.len(), "Upload too large");
        ApiError::from(e)
    })?;

    let descriptor = state
        .service
        .upload_bytes(content, filename.clone())
        .await
        .map_err(|e| {
            warn!(client = %ip, original = %filename, "Upload failed: {}", e);
            ApiError::from(e)
        })?;

    info!(
        client = %ip,
        filename = %descriptor.filename,
        original = %filename,
        content_type = %descriptor.content_type,
        size = descriptor.size,
        "File uploaded"
    );

    Ok(Json(ApiResponse::new(descriptor)))
}

/// GET /files - List stored files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
) -> Result<Json<ApiResponse<FileListResponse>>, ApiError> {
    let files = state.service.list_files().await?;

    info!(client = %ip, total = files.len(), "Listed files");

    Ok(Json(ApiResponse::new(FileListResponse::from(files))))
}

/// GET /files/:name - Download a stored file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .service
        .stream_download(&name, DOWNLOAD_CHUNK_SIZE)
        .await
        .map_err(|e| {
            warn!(client = %ip, name = %name, "Download failed: {}", e);
            ApiError::from(e)
        })?;

    let content_type = mime_guess::from_path(&download.name).first_or_octet_stream();

    info!(client = %ip, name = %download.name, size = download.size, "Serving file");

    Response::builder()
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, download.size)
        .body(Body::from_stream(download.chunks))
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal("Failed to build response")
        })
}
