//! Client for a grabid server.

pub mod client;

pub use client::{GrabClient, Info, Probe};
