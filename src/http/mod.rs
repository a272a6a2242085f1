//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → admission gate (X-Grab-Token)
//!     → probe.rs | stream.rs (+ rate limiter) | info.rs
//!     → request.rs (target URL, client IP)
//!     → response.rs (header butler, capped relay)
//!     → Send to client
//! ```

pub mod info;
pub mod probe;
pub mod request;
pub mod response;
pub mod server;
pub mod stream;

pub use info::InfoResponse;
pub use probe::ProbeResponse;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
