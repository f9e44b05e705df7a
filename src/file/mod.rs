//! File transfer core.
//!
//! - [`NameGenerator`]: random hexadecimal stored names
//! - [`ContentValidator`]: media-type sniffing against an allow-list
//! - [`FileStore`]: the flat upload directory
//! - [`TransferService`]: upload, resolve, list and chunked download,
//!   shared by the HTTP and gRPC front-ends

mod naming;
mod service;
mod sniff;
mod storage;

pub use naming::{NameGenerator, NAME_BYTES};
pub use service::{ChunkStream, Download, FileMetadata, TransferService, UploadDescriptor};
pub use sniff::{ContentValidator, SNIFF_LEN};
pub use storage::{FileStore, StoredFile};

/// Chunk size for streamed downloads (64 KiB).
pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// URL under which a stored file is served by the HTTP API.
pub fn access_url(name: &str) -> String {
    format!("/files/{name}")
}
