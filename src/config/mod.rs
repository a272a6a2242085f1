//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file (loader.rs)
//!     → environment overlay (PORT, GRAB_*)
//!     → validation.rs (semantic checks)
//!     → GrabConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Limit expressions ("1GB", "1-5") fall back to defaults instead of failing

pub mod loader;
pub mod parse;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use parse::{parse_rate_limit, parse_size, RateSpec};
pub use schema::{
    AuthConfig, GrabConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    UpstreamConfig,
};
