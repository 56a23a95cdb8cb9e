//! Shared LED state service.
//!
//! A single JSON record (color, LED count, revision, timestamp) is kept on
//! disk and served over HTTP. Devices poll it; a front-end updates it.

pub mod api;
pub mod api_client;
pub mod config;
pub mod error;
pub mod store;
pub mod tracing;
pub mod validate;
