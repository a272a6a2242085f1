//! Error types for the grab pipeline.
//!
//! Every [`GrabError`] is raised before the first body byte is written, so it
//! always maps to a clean status response. Failures after that point are
//! [`RelayError`]s and can only be logged.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Rejection outcomes of a probe, stream or info request.
#[derive(Debug, Error)]
pub enum GrabError {
    /// The `url` query parameter is absent or empty.
    #[error("Missing url parameter")]
    MissingUrl,

    /// The `url` query parameter is not an absolute http(s) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The endpoint does not accept this HTTP method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The shared-secret token is absent or does not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// The client's token bucket is empty.
    #[error("Too Many Requests")]
    RateLimited,

    /// Every concurrency slot is in use.
    #[error("Service Unavailable")]
    CapacityExhausted,

    /// The upstream declared a body larger than the size cap.
    #[error("Payload Too Large: declared {declared} bytes, limit {limit} bytes")]
    PayloadTooLarge { declared: u64, limit: u64 },

    /// The upstream could not be reached (DNS, connect, timeout).
    #[error("Failed to reach source: {0}")]
    UpstreamUnreachable(String),

    /// The upstream answered with a status >= 400.
    #[error("Source returned error: {0}")]
    UpstreamStatus(u16),
}

impl GrabError {
    /// HTTP status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::CapacityExhausted => StatusCode::SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamUnreachable(_) | Self::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingUrl | Self::InvalidUrl(_) | Self::MethodNotAllowed => "bad_input",
            Self::Unauthorized => "auth",
            Self::RateLimited => "rate",
            Self::CapacityExhausted => "capacity",
            Self::PayloadTooLarge { .. } => "size",
            Self::UpstreamUnreachable(_) | Self::UpstreamStatus(_) => "upstream",
        }
    }

    /// Whether a client may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::CapacityExhausted
                | Self::UpstreamUnreachable(_)
                | Self::UpstreamStatus(_)
        )
    }
}

/// `Retry-After` value for retryable rejections, in seconds.
const RETRY_AFTER_SECS: &str = "1";

impl IntoResponse for GrabError {
    fn into_response(self) -> Response {
        crate::observability::metrics::record_rejection(self.reason());
        let mut response = (self.status(), self.to_string()).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

/// A failure while relaying body bytes, after status and headers were sent.
#[derive(Debug, Error)]
#[error("upstream body read failed after {relayed} bytes: {message}")]
pub struct RelayError {
    pub relayed: u64,
    pub message: String,
}

/// Failures that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GrabError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(GrabError::InvalidUrl("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GrabError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(GrabError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GrabError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(GrabError::CapacityExhausted.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            GrabError::PayloadTooLarge { declared: 10, limit: 5 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(GrabError::UpstreamUnreachable("dns".into()).status(), StatusCode::BAD_GATEWAY);
        // An upstream 404 must never leak through as a 404.
        assert_eq!(GrabError::UpstreamStatus(404).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_retryable() {
        assert!(GrabError::RateLimited.is_retryable());
        assert!(GrabError::CapacityExhausted.is_retryable());
        assert!(!GrabError::Unauthorized.is_retryable());
        assert!(!GrabError::PayloadTooLarge { declared: 2, limit: 1 }.is_retryable());
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = GrabError::UpstreamStatus(404).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Source returned error: 404");
    }

    #[test]
    fn test_retry_after_only_on_retryable() {
        let limited = GrabError::RateLimited.into_response();
        assert_eq!(limited.headers()[header::RETRY_AFTER], "1");

        let full = GrabError::CapacityExhausted.into_response();
        assert_eq!(full.headers()[header::RETRY_AFTER], "1");

        let too_large = GrabError::PayloadTooLarge { declared: 2, limit: 1 }.into_response();
        assert!(too_large.headers().get(header::RETRY_AFTER).is_none());

        let denied = GrabError::Unauthorized.into_response();
        assert!(denied.headers().get(header::RETRY_AFTER).is_none());
    }
}
