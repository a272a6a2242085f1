//! Request inspection.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Resolve the client IP used as the rate-limit key
//! - Extract and validate the `url` target parameter

use axum::http::{HeaderMap, HeaderValue, Request, Uri};
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::error::GrabError;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Issues a fresh UUID v4 for every request that arrives without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGrabRequestId;

impl MakeRequestId for MakeGrabRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Resolve the rate-limit key for a request.
///
/// The raw `X-Forwarded-For` value wins when present; otherwise the peer
/// address is used. A `host:port` suffix is stripped either way.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => strip_port(forwarded).to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Strip a port from `host:port` or `[v6]:port`. Anything else is returned as-is.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((host, port)) if !port.contains(':') => host,
            _ => addr,
        };
    }
    match addr.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => addr,
    }
}

/// Extract the absolute http(s) target from the `url` query parameter.
pub fn target_url(uri: &Uri) -> Result<Url, GrabError> {
    let raw = uri
        .query()
        .and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|value| !value.is_empty())
        .ok_or(GrabError::MissingUrl)?;

    let url = Url::parse(&raw).map_err(|e| GrabError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GrabError::InvalidUrl(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(GrabError::InvalidUrl("missing host".to_string()));
    }

    Ok(url)
}
