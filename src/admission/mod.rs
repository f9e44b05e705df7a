//! Admission control shared by the HTTP and gRPC front-ends.
//!
//! Every classified call must hold a [`Permit`] from one of two independent
//! pools before any work runs:
//!
//! - [`OperationClass::Transfer`]: uploads and downloads
//! - [`OperationClass::List`]: directory listings
//!
//! Acquisition never waits. When a pool is exhausted the call is rejected
//! immediately and the front-end answers with 429 / `RESOURCE_EXHAUSTED`.
//! A permit is released when it is dropped, so every exit path (error
//! return, panic unwind, client disconnect) gives it back.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use image_service::admission::{AdmissionController, OperationClass};
//!
//! let admission = Arc::new(AdmissionController::new(1, 10));
//!
//! let permit = admission.try_acquire(OperationClass::Transfer).unwrap();
//! assert!(admission.try_acquire(OperationClass::Transfer).is_none());
//!
//! drop(permit);
//! assert_eq!(admission.in_use(OperationClass::Transfer), 0);
//! ```

mod body;

pub use body::PermitBody;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use thiserror::Error;

/// Fully-qualified gRPC service prefix used for call classification.
pub const RPC_SERVICE_PREFIX: &str = "/image_service.FileService/";

/// Category of request sharing one permit budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Uploads and downloads.
    Transfer,
    /// Directory enumeration.
    List,
}

/// A classified inbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Download,
    List,
}

impl Operation {
    /// The permit pool this operation draws from.
    pub fn class(self) -> OperationClass {
        match self {
            Operation::Upload | Operation::Download => OperationClass::Transfer,
            Operation::List => OperationClass::List,
        }
    }

    /// Classify an HTTP request by method and path.
    ///
    /// Returns `None` for calls that bypass admission (health probes,
    /// unknown routes).
    pub fn classify_http(method: &Method, path: &str) -> Option<Self> {
        match (method, path) {
            (&Method::POST, "/upload") => Some(Operation::Upload),
            (&Method::GET | &Method::HEAD, "/files" | "/files/") => Some(Operation::List),
            (&Method::GET | &Method::HEAD, p) if p.starts_with("/files/") => {
                Some(Operation::Download)
            }
            _ => None,
        }
    }

    /// Classify a gRPC call by its fully-qualified method path.
    pub fn classify_rpc(path: &str) -> Option<Self> {
        match path.strip_prefix(RPC_SERVICE_PREFIX)? {
            "UploadFile" => Some(Operation::Upload),
            "DownloadFile" => Some(Operation::Download),
            "ListFiles" => Some(Operation::List),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::List => "list",
        };
        f.write_str(name)
    }
}

/// The pool for an operation is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many {operation} requests")]
pub struct AdmissionRejected {
    /// The operation that was turned away.
    pub operation: Operation,
}

/// Non-blocking counting semaphore.
#[derive(Debug)]
struct PermitPool {
    limit: usize,
    in_use: AtomicUsize,
}

impl PermitPool {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        let released = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if released.is_err() {
            tracing::error!("permit released without a matching acquire");
            debug_assert!(false, "permit released without a matching acquire");
        }
    }
}

/// Two independent permit pools guarding the transfer service.
///
/// One instance is shared (behind an `Arc`) by both front-ends.
#[derive(Debug)]
pub struct AdmissionController {
    transfer: PermitPool,
    list: PermitPool,
}

impl AdmissionController {
    /// Create a controller with fixed limits. A limit of zero rejects every call.
    pub fn new(transfer_limit: usize, list_limit: usize) -> Self {
        Self {
            transfer: PermitPool::new(transfer_limit),
            list: PermitPool::new(list_limit),
        }
    }

    fn pool(&self, class: OperationClass) -> &PermitPool {
        match class {
            OperationClass::Transfer => &self.transfer,
            OperationClass::List => &self.list,
        }
    }

    /// Take a permit if one is free. Never blocks.
    pub fn try_acquire(self: &Arc<Self>, class: OperationClass) -> Option<Permit> {
        self.pool(class).try_acquire().then(|| Permit {
            controller: Arc::clone(self),
            class,
        })
    }

    /// Classify-and-acquire step shared by both front-ends.
    ///
    /// Unclassified calls pass through without a permit.
    pub fn admit(
        self: &Arc<Self>,
        operation: Option<Operation>,
    ) -> Result<Option<Permit>, AdmissionRejected> {
        let Some(operation) = operation else {
            return Ok(None);
        };
        match self.try_acquire(operation.class()) {
            Some(permit) => Ok(Some(permit)),
            None => Err(AdmissionRejected { operation }),
        }
    }

    /// Permits currently held for a class.
    pub fn in_use(&self, class: OperationClass) -> usize {
        self.pool(class).in_use.load(Ordering::Acquire)
    }

    /// Configured limit for a class.
    pub fn limit(&self, class: OperationClass) -> usize {
        self.pool(class).limit
    }
}

/// A held admission slot. Dropping it releases the slot exactly once.
#[must_use = "dropping a permit releases it immediately"]
#[derive(Debug)]
pub struct Permit {
    controller: Arc<AdmissionController>,
    class: OperationClass,
}

impl Permit {
    /// The pool this permit was drawn from.
    pub fn class(&self) -> OperationClass {
        self.class
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.controller.pool(self.class).release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_acquire_up_to_limit() {
        let admission = Arc::new(AdmissionController::new(2, 1));

        let a = admission.try_acquire(OperationClass::Transfer);
        let b = admission.try_acquire(OperationClass::Transfer);
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(admission.try_acquire(OperationClass::Transfer).is_none());
        assert_eq!(admission.in_use(OperationClass::Transfer), 2);

        drop(a);
        assert_eq!(admission.in_use(OperationClass::Transfer), 1);
        assert!(admission.try_acquire(OperationClass::Transfer).is_some());
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let admission = Arc::new(AdmissionController::new(0, 0));
        assert!(admission.try_acquire(OperationClass::Transfer).is_none());
        assert!(admission.try_acquire(OperationClass::List).is_none());
        assert_eq!(admission.in_use(OperationClass::Transfer), 0);
    }

    #[test]
    fn test_classes_are_independent() {
        let admission = Arc::new(AdmissionController::new(1, 1));

        let _transfer = admission.try_acquire(OperationClass::Transfer).unwrap();
        assert!(admission.try_acquire(OperationClass::Transfer).is_none());

        let list = admission.try_acquire(OperationClass::List);
        assert!(list.is_some());
        assert_eq!(list.unwrap().class(), OperationClass::List);
    }

    #[test]
    fn test_admit_unclassified_passes_through() {
        let admission = Arc::new(AdmissionController::new(0, 0));
        let permit = admission.admit(None).unwrap();
        assert!(permit.is_none());
    }

    #[test]
    fn test_admit_rejection_names_operation() {
        let admission = Arc::new(AdmissionController::new(0, 0));

        let err = admission.admit(Some(Operation::Download)).unwrap_err();
        assert_eq!(err.operation, Operation::Download);
        assert_eq!(err.to_string(), "too many download requests");

        let err = admission.admit(Some(Operation::List)).unwrap_err();
        assert_eq!(err.to_string(), "too many list requests");
    }

    #[test]
    fn test_upload_and_download_share_a_budget() {
        let admission = Arc::new(AdmissionController::new(1, 10));

        let _upload = admission.admit(Some(Operation::Upload)).unwrap();
        assert!(admission.admit(Some(Operation::Download)).is_err());
        assert!(admission.admit(Some(Operation::List)).is_ok());
    }

    #[test]
    fn test_permit_released_on_panic() {
        let admission = Arc::new(AdmissionController::new(1, 1));

        for _ in 0..5 {
            let admission = Arc::clone(&admission);
            let result = std::panic::catch_unwind(move || {
                let _permit = admission.try_acquire(OperationClass::Transfer).unwrap();
                panic!("handler failed");
            });
            assert!(result.is_err());
        }

        assert_eq!(admission.in_use(OperationClass::Transfer), 0);
        assert!(admission.try_acquire(OperationClass::Transfer).is_some());
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_limit() {
        const LIMIT: usize = 4;
        const THREADS: usize = 32;

        let admission = Arc::new(AdmissionController::new(LIMIT, 1));
        let peak = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let admission = Arc::clone(&admission);
                let peak = Arc::clone(&peak);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut granted = 0;
                    for _ in 0..200 {
                        if let Some(permit) = admission.try_acquire(OperationClass::Transfer) {
                            granted += 1;
                            let now = admission.in_use(OperationClass::Transfer);
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            drop(permit);
                        }
                    }
                    granted
                })
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert!(granted > 0);
        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert_eq!(admission.in_use(OperationClass::Transfer), 0);
    }

    #[test]
    fn test_classify_http() {
        assert_eq!(
            Operation::classify_http(&Method::POST, "/upload"),
            Some(Operation::Upload)
        );
        assert_eq!(
            Operation::classify_http(&Method::GET, "/files"),
            Some(Operation::List)
        );
        assert_eq!(
            Operation::classify_http(&Method::GET, "/files/"),
            Some(Operation::List)
        );
        assert_eq!(
            Operation::classify_http(&Method::GET, "/files/abc.png"),
            Some(Operation::Download)
        );
        assert_eq!(
            Operation::classify_http(&Method::HEAD, "/files/abc.png"),
            Some(Operation::Download)
        );
        assert_eq!(
            Operation::classify_http(&Method::HEAD, "/files"),
            Some(Operation::List)
        );
        assert_eq!(Operation::classify_http(&Method::GET, "/health"), None);
        assert_eq!(Operation::classify_http(&Method::GET, "/upload"), None);
        assert_eq!(Operation::classify_http(&Method::DELETE, "/files/a"), None);
    }

    #[test]
    fn test_classify_rpc() {
        assert_eq!(
            Operation::classify_rpc("/image_service.FileService/UploadFile"),
            Some(Operation::Upload)
        );
        assert_eq!(
            Operation::classify_rpc("/image_service.FileService/DownloadFile"),
            Some(Operation::Download)
        );
        assert_eq!(
            Operation::classify_rpc("/image_service.FileService/ListFiles"),
            Some(Operation::List)
        );
        assert_eq!(
            Operation::classify_rpc("/image_service.FileService/HealthCheck"),
            None
        );
        assert_eq!(Operation::classify_rpc("/other.Service/UploadFile"), None);
    }
}
