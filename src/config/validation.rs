//! Configuration validation.
//!
//! Serde and the expression parsers handle syntax; this module rejects
//! values that parse but cannot run. All problems are reported together.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::GrabConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.max_concurrent must be at least 1")]
    ZeroConcurrency,

    #[error("limits.max_concurrent must be at most {max} (got {got})")]
    ConcurrencyTooLarge { got: usize, max: usize },

    #[error("limits.max_size must resolve to at least 1 byte")]
    ZeroSizeCap,

    #[error("rate_limit.limit burst must be at least 1 (got {0:?})")]
    ZeroBurst(String),

    #[error("{field} must be at least 1 second")]
    ZeroDuration { field: &'static str },

    #[error("observability.log_format must be \"pretty\" or \"json\" (got {0:?})")]
    UnknownLogFormat(String),

    #[error("observability.metrics_address is not a socket address: {0:?}")]
    BadMetricsAddress(String),
}

/// Validate a fully-merged configuration.
pub fn validate_config(config: &GrabConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.limits.max_concurrent {
        0 => errors.push(ValidationError::ZeroConcurrency),
        got if got > Semaphore::MAX_PERMITS => errors.push(ValidationError::ConcurrencyTooLarge {
            got,
            max: Semaphore::MAX_PERMITS,
        }),
        _ => {}
    }
    if config.limits.max_size_bytes() == 0 {
        errors.push(ValidationError::ZeroSizeCap);
    }
    if config.rate_limit.spec().burst == 0 {
        errors.push(ValidationError::ZeroBurst(config.rate_limit.limit.clone()));
    }

    let durations = [
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("rate_limit.idle_ttl_secs", config.rate_limit.idle_ttl_secs),
        ("upstream.probe_timeout_secs", config.upstream.probe_timeout_secs),
    ];
    for (field, secs) in durations {
        if secs == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::UnknownLogFormat(format.to_string()));
    }

    let metrics_address = &config.observability.metrics_address;
    if !metrics_address.is_empty() && metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadMetricsAddress(metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
