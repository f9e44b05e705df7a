//! Health check handler.

use axum::Json;
use tracing::debug;

use super::ClientIp;
use crate::web::dto::{ApiResponse, HealthResponse};

/// GET /health
pub async fn health(ClientIp(ip): ClientIp) -> Json<ApiResponse<HealthResponse>> {
    debug!(client = %ip, "Health check");

    Json(ApiResponse::new(HealthResponse {
        status: "healthy",
        service: "file-upload-service",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
