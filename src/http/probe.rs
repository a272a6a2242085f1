//! `HEAD|GET /api/v1/probe?url=<target>`
//!
//! Reports the target's declared size and type without transferring its body.
//! Probes pass only the admission gate; they are neither rate limited nor
//! counted against stream slots.

use axum::{
    extract::State,
    http::{Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::GrabError;
use crate::http::request::target_url;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream::ProbeResult;

/// JSON body of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// Declared size in bytes, `-1` when unknown.
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl From<ProbeResult> for ProbeResponse {
    fn from(result: ProbeResult) -> Self {
        Self {
            size: result
                .size
                .and_then(|size| i64::try_from(size).ok())
                .unwrap_or(-1),
            content_type: result.content_type,
        }
    }
}

pub async fn probe_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let start = Instant::now();
    let response = match probe(&state, &method, &uri).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    };
    metrics::record_request("probe", response.status().as_u16(), start);
    response
}

async fn probe(state: &AppState, method: &Method, uri: &Uri) -> Result<ProbeResponse, GrabError> {
    if method != Method::HEAD && method != Method::GET {
        return Err(GrabError::MethodNotAllowed);
    }
    let target = target_url(uri)?;

    tracing::debug!(target = %target, "Probing upstream");
    let result = state.upstream.probe(&target).await?;
    Ok(result.into())
}
