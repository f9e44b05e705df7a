//! Response DTOs for the HTTP API.

use serde::Serialize;

use crate::file::FileMetadata;

/// Success envelope: `{"status": "success", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always `"success"`.
    pub status: &'static str,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// Health check payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// File listing payload.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileMetadata>,
    pub total: usize,
}

impl From<Vec<FileMetadata>> for FileListResponse {
    fn from(files: Vec<FileMetadata>) -> Self {
        Self {
            total: files.len(),
            files,
        }
    }
}
