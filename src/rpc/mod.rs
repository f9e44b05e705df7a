//! gRPC front-end (`image_service.FileService`).
//!
//! Methods:
//! - `UploadFile` (unary, whole file in one message)
//! - `ListFiles` (unary)
//! - `DownloadFile` (server streaming, 64 KiB chunks)
//! - `HealthCheck` (unary, not admission-controlled)

pub mod admission;
pub mod proto;
pub mod server;
pub mod service;

pub use proto::file_service_client::FileServiceClient;
pub use proto::file_service_server::{FileService, FileServiceServer};
pub use server::RpcServer;
pub use service::FileServiceImpl;
