//! Router configuration for the HTTP API.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::handlers::{download_file, health, list_files, upload_file, AppState};
use super::middleware::admission_guard;
use crate::admission::AdmissionController;

/// Allowance for multipart framing on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Turn a handler panic into the standard 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    ApiError::internal("An internal error occurred").into_response()
}

/// Create the HTTP API router.
pub fn create_router(app_state: Arc<AppState>, admission: Arc<AdmissionController>) -> Router {
    let upload_limit = usize::try_from(app_state.service.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files", get(list_files))
        .route("/files/", get(list_files))
        .route("/files/:name", get(download_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(middleware::from_fn(move |req, next| {
                    admission_guard(admission.clone(), req, next)
                })),
        )
        .with_state(app_state)
}
