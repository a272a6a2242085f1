//! Upstream fetching subsystem.
//!
//! Probe and stream requests both go through one pooled client; only the
//! probe is bounded by a timeout.

pub mod client;

pub use client::{declared_length, ProbeResult, UpstreamClient};
