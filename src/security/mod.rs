//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → access_control.rs (shared-secret token)
//! Stream requests additionally:
//!     → rate_limit.rs (per-client token bucket)
//!     → limits.rs (non-blocking concurrency slot)
//!     → Stream service
//! ```
//!
//! # Design Decisions
//! - Reject fast: no gate ever queues a request
//! - Fail closed: a configured secret is required on every endpoint
//! - Probes pass only the admission gate

pub mod access_control;
pub mod limits;
pub mod rate_limit;

pub use access_control::{access_control_middleware, AccessControl, GRAB_TOKEN_HEADER};
pub use limits::{StreamPermit, StreamSlots};
pub use rate_limit::{rate_limit_middleware, ClientRateLimiter};
