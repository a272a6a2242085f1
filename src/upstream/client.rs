//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Issue metadata-only probes with a bounded timeout
//! - Issue full fetches with no client-side timeout
//! - Classify failures: unreachable (network/DNS/timeout) vs. error status

use axum::http::{header, HeaderMap};
use std::time::Duration;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::GrabError;

/// Size and type reported by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Declared body length; `None` when the upstream did not say.
    pub size: Option<u64>,
    /// Declared content type; empty when absent.
    pub content_type: String,
}

/// Shared client for all upstream traffic.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    probe_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("grabid/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;

        Ok(Self {
            http_client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    /// HEAD the target and report its declared size and type. Never reads a body.
    pub async fn probe(&self, target: &Url) -> Result<ProbeResult, GrabError> {
        let response = self
            .http_client
            .head(target.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(unreachable)?;
        let response = check_status(response)?;

        Ok(ProbeResult {
            size: declared_length(response.headers()),
            content_type: header_string(response.headers(), header::CONTENT_TYPE),
        })
    }

    /// GET the target. The body is left unread for the caller to relay.
    pub async fn fetch(&self, target: &Url) -> Result<reqwest::Response, GrabError> {
        let response = self
            .http_client
            .get(target.clone())
            .send()
            .await
            .map_err(unreachable)?;
        check_status(response)
    }
}

fn unreachable(e: reqwest::Error) -> GrabError {
    tracing::warn!(error = %e, timeout = e.is_timeout(), "Upstream unreachable");
    GrabError::UpstreamUnreachable(e.to_string())
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GrabError> {
    let status = response.status();
    if status.as_u16() >= 400 {
        tracing::warn!(status = %status, "Upstream returned error status");
        return Err(GrabError::UpstreamStatus(status.as_u16()));
    }
    Ok(response)
}

/// The upstream's `Content-Length`, if present and well-formed.
///
/// Read from the header rather than the body size hint so HEAD responses
/// report the real size.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("500"));
        assert_eq!(declared_length(&headers), Some(500));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert_eq!(declared_length(&headers), Some(0));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let client = UpstreamClient::new(&UpstreamConfig::default()).unwrap();
        // Port 9 (discard) on loopback is closed on test machines.
        let target = Url::parse("http://127.0.0.1:9/file.bin").unwrap();

        let err = client.probe(&target).await.unwrap_err();
        assert!(matches!(err, GrabError::UpstreamUnreachable(_)));

        let err = client.fetch(&target).await.unwrap_err();
        assert!(matches!(err, GrabError::UpstreamUnreachable(_)));
    }
}
