//! Middleware for the HTTP API.

pub mod admission;

pub use admission::admission_guard;
