//! Wire messages for `image_service.FileService`.
//!
//! Field numbers are part of the wire contract.

use bytes::Bytes;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadFileRequest {
    /// Name declared by the client; only its extension is kept.
    #[prost(string, tag = "1")]
    pub filename: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub content: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadFileResponse {
    #[prost(string, tag = "1")]
    pub filename: String,
    #[prost(int64, tag = "2")]
    pub size: i64,
    #[prost(string, tag = "3")]
    pub url: String,
    #[prost(string, tag = "4")]
    pub message: String,
    #[prost(string, tag = "5")]
    pub content_type: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ListFilesRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int64, tag = "2")]
    pub size: i64,
    #[prost(string, tag = "3")]
    pub url: String,
    /// RFC 3339.
    #[prost(string, tag = "4")]
    pub created_at: String,
    /// RFC 3339.
    #[prost(string, tag = "5")]
    pub updated_at: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFilesResponse {
    #[prost(message, repeated, tag = "1")]
    pub files: Vec<FileInfo>,
    #[prost(int32, tag = "2")]
    pub total: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownloadFileRequest {
    #[prost(string, tag = "1")]
    pub filename: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownloadFileResponse {
    #[prost(bytes = "bytes", tag = "1")]
    pub chunk: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct HealthCheckRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HealthCheckResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(string, tag = "2")]
    pub service: String,
    #[prost(string, tag = "3")]
    pub version: String,
}

include!(concat!(env!("OUT_DIR"), "/image_service.FileService.rs"));
