//! `GET /api/v1/stream?url=<target>`
//!
//! Runs behind the admission gate and the rate limiter. Takes a stream slot,
//! fetches the target, and relays its body under the size cap.
//!
//! ```text
//! SLOT_ACQUIRED → UPSTREAM_DISPATCHED → HEADERS_SENT → RELAYING → DONE | RELAY_FAILED
//!        ↘ any rejection before HEADERS_SENT → clean error status, no body
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use std::time::Instant;

use crate::error::GrabError;
use crate::http::request::{request_id, target_url};
use crate::http::response::{relay_headers, RelayContext, RelayStream};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream::declared_length;

pub async fn stream_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let response = match stream(&state, &method, &uri, &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    // Measured at header commit; the relay itself may run much longer.
    metrics::record_request("stream", response.status().as_u16(), start);
    response
}

async fn stream(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Response, GrabError> {
    if method != Method::GET {
        return Err(GrabError::MethodNotAllowed);
    }
    let target = target_url(uri)?;

    let permit = state.slots.try_acquire().ok_or_else(|| {
        tracing::warn!(capacity = state.slots.capacity(), "No stream slot available");
        GrabError::CapacityExhausted
    })?;

    tracing::debug!(target = %target, in_use = state.slots.in_use(), "Fetching upstream");
    let upstream = state.upstream.fetch(&target).await?;

    let limit = state.max_size;
    if let Some(declared) = declared_length(upstream.headers()) {
        if declared > limit {
            tracing::warn!(target = %target, declared, limit, "Upstream declared size exceeds cap");
            return Err(GrabError::PayloadTooLarge { declared, limit });
        }
    }

    let response_headers = relay_headers(upstream.headers(), &target);
    let context = RelayContext {
        request_id: request_id(headers).to_string(),
        target: target.to_string(),
    };
    let relay = RelayStream::new(upstream.bytes_stream().boxed(), limit, context).with_permit(permit);

    let mut response = Response::new(Body::from_stream(relay));
    *response.headers_mut() = response_headers;
    Ok(response)
}
