//! Transport-agnostic file transfer operations.
//!
//! Upload runs validate → name → store → describe; download and listing
//! resolve names against the store. Both front-ends call into the same
//! [`TransferService`] instance.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::{Result, ServiceError};

use super::naming::NameGenerator;
use super::sniff::{ContentValidator, SNIFF_LEN};
use super::storage::{FileStore, StoredFile};
use super::{access_url, DEFAULT_MAX_FILE_SIZE};

/// Description of a successfully stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadDescriptor {
    /// Generated stored name.
    pub filename: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Sniffed media type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Access path for the HTTP API.
    pub url: String,
}

/// Listing entry for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFile> for FileMetadata {
    fn from(stored: StoredFile) -> Self {
        Self {
            url: access_url(&stored.name),
            size: stored.size,
            created_at: stored.created.into(),
            updated_at: stored.modified.into(),
            name: stored.name,
        }
    }
}

/// Lazy sequence of file chunks. Every chunk but the last is full-sized.
pub type ChunkStream = BoxStream<'static, io::Result<Bytes>>;

/// An opened download.
pub struct Download {
    /// Resolved stored name.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// File transfer operations shared by every front-end.
#[derive(Debug)]
pub struct TransferService {
    store: FileStore,
    validator: ContentValidator,
    names: NameGenerator,
    max_file_size: u64,
}

impl TransferService {
    /// Create a new TransferService.
    pub fn new(store: FileStore, validator: ContentValidator) -> Self {
        Self {
            store,
            validator,
            names: NameGenerator::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the upload size bound enforced by the front-ends.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Reject a body larger than the configured bound.
    pub fn check_size(&self, len: u64) -> Result<()> {
        if len > self.max_file_size {
            return Err(ServiceError::Validation(format!(
                "File too large (max {} bytes)",
                self.max_file_size
            )));
        }
        Ok(())
    }

    /// Store an upload read from a seekable, already size-bounded source.
    ///
    /// The first [`SNIFF_LEN`] bytes decide the media type; the source is then
    /// rewound so the sniffed prefix is written too. A failed copy leaves
    /// nothing behind in the store.
    pub fn upload<R>(
        &self,
        mut source: R,
        declared_size: u64,
        declared_name: &str,
    ) -> Result<UploadDescriptor>
    where
        R: Read + Seek,
    {
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        Read::take(&mut source, SNIFF_LEN as u64).read_to_end(&mut prefix)?;

        let content_type = self.validator.validate(&prefix)?;
        source.seek(SeekFrom::Start(0))?;

        let filename = self.names.generate(declared_name);
        let written = self
            .store
            .create_with(&filename, |file| io::copy(&mut source, file))?;

        info!(
            filename = %filename,
            original = %declared_name,
            content_type = %content_type,
            size = written,
            "Stored upload"
        );

        Ok(UploadDescriptor {
            url: access_url(&filename),
            filename,
            size: declared_size,
            content_type,
        })
    }

    /// [`upload`](Self::upload) for an in-memory body, run on the blocking pool.
    pub async fn upload_bytes(
        self: &Arc<Self>,
        content: Bytes,
        declared_name: String,
    ) -> Result<UploadDescriptor> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let size = content.len() as u64;
            service.upload(Cursor::new(content), size, &declared_name)
        })
        .await?
    }

    /// Resolve a caller-supplied name to an existing stored file.
    ///
    /// Directory components are ignored.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.store.resolve(name)
    }

    /// Enumerate stored files, sorted by name.
    pub fn list(&self) -> Result<Vec<FileMetadata>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(FileMetadata::from)
            .collect())
    }

    /// [`list`](Self::list), run on the blocking pool.
    pub async fn list_files(self: &Arc<Self>) -> Result<Vec<FileMetadata>> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || service.list()).await?
    }

    /// Open `name` for a chunked download.
    pub async fn stream_download(&self, name: &str, chunk_size: usize) -> Result<Download> {
        let path = self.resolve(name)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!("file {name}")));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();

        Ok(Download {
            name,
            size,
            chunks: chunk_stream(file, chunk_size),
        })
    }
}

/// Split `reader` into `chunk_size` pieces; only the last may be shorter.
pub(crate) fn chunk_stream<R>(reader: R, chunk_size: usize) -> ChunkStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    stream::try_unfold(reader, move |mut reader| async move {
        let mut chunk = Vec::with_capacity(chunk_size);
        AsyncReadExt::take(&mut reader, chunk_size as u64)
            .read_to_end(&mut chunk)
            .await?;
        let next = (!chunk.is_empty()).then(|| (Bytes::from(chunk), reader));
        Ok::<_, io::Error>(next)
    })
    .boxed()
}
