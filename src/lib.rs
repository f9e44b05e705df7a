//! Image service
//!
//! A file upload service exposing the same storage through an HTTP API and a
//! gRPC streaming API. Both front-ends draw from one admission budget and one
//! upload directory.

pub mod admission;
pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod rpc;
pub mod web;

pub use admission::{AdmissionController, AdmissionRejected, Operation, OperationClass, Permit};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use file::{ContentValidator, FileStore, TransferService};
