//! Admission middleware.
//!
//! Classifies each request, takes a permit from the shared controller and
//! attaches it to the response body. The permit is released when the body
//! has been fully sent, fails, or is dropped by a disconnecting client.

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::admission::{AdmissionController, Operation, PermitBody};
use crate::web::error::ApiError;
use crate::web::handlers::client_ip;

/// Admission middleware for every HTTP route.
///
/// Unclassified routes (health, unknown paths) pass straight through.
pub async fn admission_guard(
    admission: Arc<AdmissionController>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let operation = Operation::classify_http(req.method(), req.uri().path());

    let permit = match admission.admit(operation) {
        Ok(permit) => permit,
        Err(rejected) => {
            let ip = client_ip(req.headers(), req.extensions());
            warn!(
                client = %ip,
                operation = %rejected.operation,
                "Admission limit reached, rejecting request"
            );
            return ApiError::from(rejected).into_response();
        }
    };

    let response = next.run(req).await;

    match permit {
        Some(permit) => response.map(|body| Body::new(PermitBody::new(body, Some(permit)))),
        None => response,
    }
}
