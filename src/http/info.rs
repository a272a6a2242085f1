//! `GET /api/v1/info`
//!
//! Read-only view of the configured limits for client-side display.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    /// The size expression as configured, e.g. "1GB".
    pub max_size_limit: String,
    pub max_concurrent: usize,
}

pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        max_size_limit: state.config.limits.max_size_label(),
        max_concurrent: state.config.limits.max_concurrent,
    })
}
