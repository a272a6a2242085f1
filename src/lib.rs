//! grabid: a proxying content streamer.
//!
//! Probes remote files and streams them back to the caller under a size cap,
//! a concurrency cap, and a per-client rate limit.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;

pub use config::schema::GrabConfig;
pub use error::{GrabError, ServerError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
