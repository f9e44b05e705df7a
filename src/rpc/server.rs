//! gRPC server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::admission::AdmissionController;
use crate::file::TransferService;
use crate::{Result, ServiceError};

use super::admission::AdmissionLayer;
use super::proto::file_service_server::FileServiceServer;
use super::service::FileServiceImpl;

/// Allowance for message framing on top of the file size limit.
const MESSAGE_OVERHEAD: usize = 64 * 1024;

/// Streaming front-end for the transfer service.
pub struct RpcServer {
    addr: SocketAddr,
    service: Arc<TransferService>,
    admission: Arc<AdmissionController>,
}

impl RpcServer {
    pub fn new(
        addr: SocketAddr,
        service: Arc<TransferService>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self {
            addr,
            service,
            admission,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn file_service(&self) -> FileServiceServer<FileServiceImpl> {
        let max_message = usize::try_from(self.service.max_file_size())
            .unwrap_or(usize::MAX)
            .saturating_add(MESSAGE_OVERHEAD);

        FileServiceServer::new(FileServiceImpl::new(self.service.clone()))
            .max_decoding_message_size(max_message)
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let file_service = self.file_service();

        Server::builder()
            .layer(AdmissionLayer::new(self.admission))
            .add_service(file_service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
            .map_err(|e| ServiceError::Internal(format!("gRPC server error: {e}")))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("gRPC server listening on {}", listener.local_addr()?);
        self.serve(listener, shutdown).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("gRPC server listening on {}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = self.serve(listener, std::future::pending()).await {
                tracing::error!("{}", e);
            }
        });

        Ok(local_addr)
    }
}
