//! Response construction for relayed downloads.
//!
//! # Responsibilities
//! - Pick which upstream headers reach the client ("header butler")
//! - Relay the upstream body chunk by chunk, never past the size cap
//! - Record the outcome of a relay once status and headers are committed
//!
//! # Design Decisions
//! - Streaming only; the body is never buffered whole
//! - The size cap is a hard ceiling on bytes written, not just a pre-check
//! - After the first body byte, failures are log-only

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue};
use futures_util::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use url::Url;

use crate::error::RelayError;
use crate::observability::metrics;
use crate::security::StreamPermit;
use crate::upstream::declared_length;

/// Headers forwarded to the client for a relayed body.
///
/// `Content-Length` and `Content-Type` are copied when the upstream sent them.
/// `Content-Disposition` is copied, or synthesized from the last path segment
/// of `target` when the upstream sent none.
pub fn relay_headers(upstream: &HeaderMap, target: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(length) = declared_length(upstream) {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(content_type) = non_empty(upstream, header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }

    match non_empty(upstream, header::CONTENT_DISPOSITION) {
        Some(disposition) => {
            headers.insert(header::CONTENT_DISPOSITION, disposition.clone());
        }
        None => {
            let synthesized = attachment_filename(target).and_then(|name| {
                HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)).ok()
            });
            if let Some(value) = synthesized {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }
    }

    headers
}

fn non_empty(headers: &HeaderMap, name: header::HeaderName) -> Option<&HeaderValue> {
    headers.get(name).filter(|v| !v.is_empty())
}

/// Last path segment of `target`, if it is non-empty.
pub fn attachment_filename(target: &Url) -> Option<&str> {
    target
        .path_segments()?
        .last()
        .filter(|segment| !segment.is_empty())
}

/// Where a relay ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Relaying,
    /// Upstream ended within the cap.
    Complete,
    /// The cap was reached with upstream bytes left over.
    Truncated,
    /// Reading from upstream failed.
    Failed,
    /// Dropped before completion, usually a client disconnect.
    Aborted,
}

/// Identifies a relay in log events.
#[derive(Debug, Clone, Default)]
pub struct RelayContext {
    pub request_id: String,
    pub target: String,
}

/// Upstream body stream capped at `limit` bytes.
///
/// Holds the stream's concurrency permit and drops it the moment the relay
/// settles, whichever way it ends.
pub struct RelayStream<S> {
    inner: S,
    remaining: u64,
    relayed: u64,
    state: RelayState,
    context: RelayContext,
    permit: Option<StreamPermit>,
}

impl<S> RelayStream<S> {
    pub fn new(inner: S, limit: u64, context: RelayContext) -> Self {
        Self {
            inner,
            remaining: limit,
            relayed: 0,
            state: RelayState::Relaying,
            context,
            permit: None,
        }
    }

    /// Tie a concurrency slot to the lifetime of this relay.
    pub fn with_permit(mut self, permit: StreamPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    fn settle(&mut self, outcome: RelayState, detail: Option<&str>) {
        self.state = outcome;
        self.permit = None;
        metrics::record_bytes_relayed(self.relayed);

        let RelayContext { request_id, target } = &self.context;
        match outcome {
            RelayState::Relaying => {}
            RelayState::Complete => {
                tracing::debug!(request_id = %request_id, target = %target, relayed = self.relayed, "Relay complete");
            }
            RelayState::Truncated => {
                metrics::record_relay_truncation();
                tracing::warn!(request_id = %request_id, target = %target, relayed = self.relayed, "Size cap reached, relay truncated");
            }
            RelayState::Failed => {
                metrics::record_relay_failure();
                tracing::warn!(
                    request_id = %request_id,
                    target = %target,
                    relayed = self.relayed,
                    error = detail.unwrap_or_default(),
                    "Relay failed reading upstream"
                );
            }
            RelayState::Aborted => {
                metrics::record_relay_failure();
                tracing::warn!(request_id = %request_id, target = %target, relayed = self.relayed, "Relay aborted before completion");
            }
        }
    }
}

impl<S, E> Stream for RelayStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<Bytes, RelayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.state != RelayState::Relaying {
            return Poll::Ready(None);
        }
        if this.remaining == 0 {
            // Cap filled on a chunk boundary; one more read tells complete from truncated.
            loop {
                let outcome = match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                    Some(Ok(chunk)) if chunk.is_empty() => continue,
                    Some(Ok(_)) => RelayState::Truncated,
                    Some(Err(_)) | None => RelayState::Complete,
                };
                this.settle(outcome, None);
                return Poll::Ready(None);
            }
        }

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(mut chunk)) => {
                let len = chunk.len() as u64;
                if len > this.remaining {
                    // remaining < len <= usize::MAX here
                    chunk.truncate(this.remaining as usize);
                    this.relayed += this.remaining;
                    this.remaining = 0;
                    this.settle(RelayState::Truncated, None);
                } else {
                    this.relayed += len;
                    this.remaining -= len;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                let message = e.to_string();
                this.settle(RelayState::Failed, Some(&message));
                Poll::Ready(Some(Err(RelayError {
                    relayed: this.relayed,
                    message,
                })))
            }
            None => {
                this.settle(RelayState::Complete, None);
                Poll::Ready(None)
            }
        }
    }
}

impl<S> Drop for RelayStream<S> {
    fn drop(&mut self) {
        if self.state == RelayState::Relaying {
            self.settle(RelayState::Aborted, None);
        }
    }
}
