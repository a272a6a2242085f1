//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::parse::{parse_rate_limit, parse_size, RateSpec};

/// Root configuration for the grab service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GrabConfig {
    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// Shared-secret admission settings.
    pub auth: AuthConfig,

    /// Size cap and concurrency cap for streams.
    pub limits: LimitsConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Upstream fetch settings.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Shared-secret admission configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Value required in `X-Grab-Token`. Empty means public mode.
    pub secret: String,
}

impl AuthConfig {
    /// True when no secret is configured.
    pub fn is_public(&self) -> bool {
        self.secret.is_empty()
    }
}

// Hand-written so the secret never reaches a log line.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &if self.is_public() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// Stream limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Human-readable size cap, e.g. "1GB", "500MB".
    pub max_size: String,

    /// Maximum simultaneous streams.
    pub max_concurrent: usize,
}

impl LimitsConfig {
    /// The size cap in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        parse_size(&self.max_size)
    }

    /// The size expression as reported to clients.
    pub fn max_size_label(&self) -> String {
        self.max_size.trim().to_string()
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_size: "1GB".to_string(),
            max_concurrent: 5,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// `<rate>-<burst>` expression, e.g. "1-5".
    pub limit: String,

    /// How often idle clients are swept, in seconds.
    pub sweep_interval_secs: u64,

    /// Idle time after which a client entry is evicted, in seconds.
    pub idle_ttl_secs: u64,
}

impl RateLimitConfig {
    pub fn spec(&self) -> RateSpec {
        parse_rate_limit(&self.limit)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: "1-5".to_string(),
            sweep_interval_secs: 60,
            idle_ttl_secs: 180,
        }
    }
}

/// Upstream fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Timeout for metadata-only probe requests, in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Prometheus endpoint bind address. Empty disables metrics.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_address: String::new(),
        }
    }
}
