//! Admission layer for the gRPC server.
//!
//! Wraps the tonic router so that every classified call takes a permit before
//! it reaches the service. The permit rides on the response body, so a
//! server-streaming download holds it until the last message has been sent
//! or the client goes away.
//!
//! Uploads that overflow the decoder's message limit are reported as
//! `INVALID_ARGUMENT` "File too large", the same code as any other oversized
//! upload.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tonic::body::BoxBody;
use tonic::transport::server::TcpConnectInfo;
use tonic::{Code, Status};
use tower::{Layer, Service};
use tracing::warn;

use crate::admission::{AdmissionController, Operation, PermitBody};

/// Tower layer installing [`AdmissionService`].
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    admission: Arc<AdmissionController>,
}

impl AdmissionLayer {
    pub fn new(admission: Arc<AdmissionController>) -> Self {
        Self { admission }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            admission: self.admission.clone(),
        }
    }
}

/// Rejects calls with `RESOURCE_EXHAUSTED` when their permit pool is empty.
#[derive(Debug, Clone)]
pub struct AdmissionService<S> {
    inner: S,
    admission: Arc<AdmissionController>,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for AdmissionService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let operation = Operation::classify_rpc(req.uri().path());
        let upload = operation == Some(Operation::Upload);

        let permit = match self.admission.admit(operation) {
            Ok(permit) => permit,
            Err(rejected) => {
                let client = req
                    .extensions()
                    .get::<TcpConnectInfo>()
                    .and_then(|info| info.remote_addr())
                    .map(|addr| addr.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(
                    client = %client,
                    operation = %rejected.operation,
                    "Admission limit reached, rejecting gRPC call"
                );
                let response = Status::resource_exhausted(rejected.to_string()).into_http();
                return Box::pin(async move { Ok(response) });
            }
        };

        // The ready service is the one that must handle the call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            if upload {
                response = oversized_as_invalid(response);
            }
            Ok(match permit {
                Some(permit) => {
                    response.map(|body| tonic::body::boxed(PermitBody::new(body, Some(permit))))
                }
                None => response,
            })
        })
    }
}

/// Replace a decode-limit `OUT_OF_RANGE` with `INVALID_ARGUMENT`.
fn oversized_as_invalid(response: http::Response<BoxBody>) -> http::Response<BoxBody> {
    match Status::from_header_map(response.headers()) {
        Some(status) if status.code() == Code::OutOfRange => {
            Status::invalid_argument("File too large").into_http()
        }
        _ => response,
    }
}
