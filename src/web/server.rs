//! HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::admission::AdmissionController;
use crate::file::TransferService;

use super::handlers::AppState;
use super::router::create_router;

/// HTTP front-end for the transfer service.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Shared admission controller.
    admission: Arc<AdmissionController>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        addr: SocketAddr,
        service: Arc<TransferService>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self {
            addr,
            app_state: Arc::new(AppState::new(service)),
            admission,
        }
    }

    /// Configured listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the router served by this server.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), self.admission.clone())
    }

    /// Run the web server until `shutdown` resolves, then drain connections.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("HTTP server listening on http://{}", local_addr);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();

        tracing::info!("HTTP server listening on http://{}", local_addr);

        tokio::spawn(async move {
            let app = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
