//! Response body that keeps a permit alive until the body is finished.

use std::pin::Pin;
use std::task::{Context, Poll};

use http_body::{Body, Frame, SizeHint};

use super::Permit;

/// Wraps a response body and releases the attached [`Permit`] once the body
/// has yielded its last frame, failed, or been dropped.
///
/// Front-ends attach the permit to the outgoing body rather than releasing
/// it when the handler returns, so a streamed download keeps its slot for
/// the whole transfer and a client disconnect (which drops the body)
/// still gives it back.
#[derive(Debug)]
pub struct PermitBody<B> {
    inner: B,
    permit: Option<Permit>,
}

impl<B> PermitBody<B> {
    /// Attach `permit` to `inner`. `None` yields a plain pass-through body.
    pub fn new(inner: B, permit: Option<Permit>) -> Self {
        Self { inner, permit }
    }
}

impl<B> Body for PermitBody<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.permit.take();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{AdmissionController, OperationClass};
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_permit_held_until_body_consumed() {
        let admission = Arc::new(AdmissionController::new(1, 1));
        let permit = admission.try_acquire(OperationClass::Transfer);

        let body = PermitBody::new(Full::new(Bytes::from_static(b"chunk")), permit);
        assert_eq!(admission.in_use(OperationClass::Transfer), 1);

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"chunk");
        assert_eq!(admission.in_use(OperationClass::Transfer), 0);
    }

    #[tokio::test]
    async fn test_permit_released_when_body_dropped_unread() {
        let admission = Arc::new(AdmissionController::new(1, 1));
        let permit = admission.try_acquire(OperationClass::Transfer);

        let body = PermitBody::new(Full::new(Bytes::from_static(b"never read")), permit);
        assert_eq!(admission.in_use(OperationClass::Transfer), 1);

        drop(body);
        assert_eq!(admission.in_use(OperationClass::Transfer), 0);
    }

    #[tokio::test]
    async fn test_pass_through_without_permit() {
        let body = PermitBody::new(Full::new(Bytes::from_static(b"ok")), None);

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"ok");
    }
}
