//! HTTP front-end.
//!
//! Routes:
//! - `GET /health`
//! - `POST /upload` (multipart field `file`)
//! - `GET /files`
//! - `GET /files/:name`
//!
//! Responses use a JSON envelope, `{"status": "success", "data": ...}` or
//! `{"status": "error", "message": ..., "code": ...}`; downloads return the raw
//! file bytes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
