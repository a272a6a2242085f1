//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GrabConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_PORT: &str = "PORT";
pub const ENV_SECRET: &str = "GRAB_SECRET";
pub const ENV_MAX_SIZE: &str = "GRAB_MAX_SIZE";
pub const ENV_MAX_CONCURRENT: &str = "GRAB_MAX_CONCURRENT";
pub const ENV_RATE_LIMIT: &str = "GRAB_RATE_LIMIT";
pub const ENV_LOG_LEVEL: &str = "GRAB_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "GRAB_LOG_FORMAT";
pub const ENV_METRICS_ADDR: &str = "GRAB_METRICS_ADDR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file (if given), overlay the process environment, and validate.
pub fn load_config(path: Option<&Path>) -> Result<GrabConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GrabConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so the mapping is testable. Empty values
/// are treated as unset.
pub fn apply_env<F>(config: &mut GrabConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get(ENV_PORT) {
        match port.trim().parse() {
            Ok(port) => config.listener.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring unparseable PORT"),
        }
    }
    if let Some(secret) = get(ENV_SECRET) {
        config.auth.secret = secret;
    }
    if let Some(max_size) = get(ENV_MAX_SIZE) {
        config.limits.max_size = max_size;
    }
    if let Some(max_concurrent) = get(ENV_MAX_CONCURRENT) {
        match max_concurrent.trim().parse() {
            Ok(n) => config.limits.max_concurrent = n,
            Err(_) => tracing::warn!(
                value = %max_concurrent,
                keeping = config.limits.max_concurrent,
                "Ignoring unparseable GRAB_MAX_CONCURRENT"
            ),
        }
    }
    if let Some(limit) = get(ENV_RATE_LIMIT) {
        config.rate_limit.limit = limit;
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    if let Some(format) = get(ENV_LOG_FORMAT) {
        config.observability.log_format = format.trim().to_ascii_lowercase();
    }
    if let Some(addr) = get(ENV_METRICS_ADDR) {
        config.observability.metrics_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overlay() {
        let mut config = GrabConfig::default();
        apply_env(
            &mut config,
            env(&[
                (ENV_PORT, "9000"),
                (ENV_SECRET, "mysecret"),
                (ENV_MAX_SIZE, "1KB"),
                (ENV_MAX_CONCURRENT, "1"),
                (ENV_RATE_LIMIT, "1-1"),
                (ENV_LOG_FORMAT, "JSON"),
            ]),
        );

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.auth.secret, "mysecret");
        assert_eq!(config.limits.max_size_bytes(), 1024);
        assert_eq!(config.limits.max_concurrent, 1);
        assert_eq!(config.rate_limit.spec().burst, 1);
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_empty_and_bad_values_keep_defaults() {
        let mut config = GrabConfig::default();
        apply_env(
            &mut config,
            env(&[
                (ENV_SECRET, ""),
                (ENV_MAX_CONCURRENT, "many"),
                (ENV_PORT, "http"),
            ]),
        );

        assert!(config.auth.is_public());
        assert_eq!(config.limits.max_concurrent, 5);
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_concurrency_fails_validation() {
        let mut config = GrabConfig::default();
        apply_env(&mut config, env(&[(ENV_MAX_CONCURRENT, "18446744073709551615")]));

        assert_eq!(config.limits.max_concurrent, usize::MAX);
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::ConcurrencyTooLarge { .. }]
        ));
    }

    #[test]
    fn test_load_file_then_validate() {
        let path = std::env::temp_dir().join(format!("grabid-test-{}.toml", std::process::id()));
        fs::write(&path, "[limits]\nmax_concurrent = 0\n").unwrap();

        let result = load_config(Some(&path));
        fs::remove_file(&path).unwrap_or_default();

        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.contains(&ValidationError::ZeroConcurrency));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Some(Path::new("/nonexistent/grabid.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
