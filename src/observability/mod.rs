//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gates and services produce:
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every event via the request span
//! - Relay failures after headers are committed exist only here

pub mod logging;
pub mod metrics;
