//! `FileService` implementation backed by [`TransferService`].

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::SecondsFormat;
use futures::stream::{BoxStream, StreamExt};
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};

use crate::file::{FileMetadata, TransferService, DOWNLOAD_CHUNK_SIZE};
use crate::ServiceError;

use super::proto::file_service_server::FileService;
use super::proto::{
    DownloadFileRequest, DownloadFileResponse, FileInfo, HealthCheckRequest, HealthCheckResponse,
    ListFilesRequest, ListFilesResponse, UploadFileRequest, UploadFileResponse,
};

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Status::invalid_argument(msg),
            ServiceError::NotFound(_) => Status::not_found(err.to_string()),
            other => {
                error!("Internal error: {}", other);
                Status::internal("internal error")
            }
        }
    }
}

impl From<FileMetadata> for FileInfo {
    fn from(meta: FileMetadata) -> Self {
        Self {
            size: i64::try_from(meta.size).unwrap_or(i64::MAX),
            created_at: meta.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: meta.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            name: meta.name,
            url: meta.url,
        }
    }
}

fn peer<T>(request: &Request<T>) -> String {
    request
        .remote_addr()
        .map(|addr: SocketAddr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// gRPC face of the transfer service.
#[derive(Debug, Clone)]
pub struct FileServiceImpl {
    service: Arc<TransferService>,
}

impl FileServiceImpl {
    pub fn new(service: Arc<TransferService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl FileService for FileServiceImpl {
    type DownloadFileStream = BoxStream<'static, Result<DownloadFileResponse, Status>>;

    async fn upload_file(
        &self,
        request: Request<UploadFileRequest>,
    ) -> Result<Response<UploadFileResponse>, Status> {
        let client = peer(&request);
        let req = request.into_inner();
        info!(client = %client, original = %req.filename, size = req.content.len(), "gRPC upload");

        self.service.check_size(req.content.len() as u64)?;

        let descriptor = self
            .service
            .upload_bytes(req.content, req.filename.clone())
            .await
            .map_err(|e| {
                warn!(client = %client, original = %req.filename, "gRPC upload failed: {}", e);
                Status::from(e)
            })?;

        info!(
            client = %client,
            filename = %descriptor.filename,
            content_type = %descriptor.content_type,
            "gRPC upload stored"
        );

        Ok(Response::new(UploadFileResponse {
            size: i64::try_from(descriptor.size).unwrap_or(i64::MAX),
            filename: descriptor.filename,
            url: descriptor.url,
            message: "File uploaded successfully via gRPC".to_string(),
            content_type: descriptor.content_type,
        }))
    }

    async fn list_files(
        &self,
        request: Request<ListFilesRequest>,
    ) -> Result<Response<ListFilesResponse>, Status> {
        let client = peer(&request);

        let files: Vec<FileInfo> = self
            .service
            .list_files()
            .await?
            .into_iter()
            .map(FileInfo::from)
            .collect();

        info!(client = %client, total = files.len(), "gRPC list");

        Ok(Response::new(ListFilesResponse {
            total: i32::try_from(files.len()).unwrap_or(i32::MAX),
            files,
        }))
    }

    async fn download_file(
        &self,
        request: Request<DownloadFileRequest>,
    ) -> Result<Response<Self::DownloadFileStream>, Status> {
        let client = peer(&request);
        let req = request.into_inner();

        let download = self
            .service
            .stream_download(&req.filename, DOWNLOAD_CHUNK_SIZE)
            .await
            .map_err(|e| {
                warn!(client = %client, name = %req.filename, "gRPC download failed: {}", e);
                Status::from(e)
            })?;

        info!(client = %client, name = %download.name, size = download.size, "gRPC download");

        let name = download.name;
        let stream = download
            .chunks
            .map(move |chunk| match chunk {
                Ok(chunk) => Ok(DownloadFileResponse { chunk }),
                Err(e) => {
                    error!(name = %name, "Failed to read chunk: {}", e);
                    Err(Status::internal("failed to read file"))
                }
            })
            .boxed();

        Ok(Response::new(stream))
    }

    async fn health_check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        tracing::debug!(client = %peer(&request), "gRPC health check");

        Ok(Response::new(HealthCheckResponse {
            status: "healthy".to_string(),
            service: "image_service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }))
    }
}
