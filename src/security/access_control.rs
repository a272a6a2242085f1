//! Admission gate.
//! Enforces the shared-secret token when one is configured.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::GrabError;

/// Header carrying the shared secret.
pub const GRAB_TOKEN_HEADER: &str = "x-grab-token";

/// State required for the admission gate.
#[derive(Clone)]
pub struct AccessControl {
    secret: Option<Arc<str>>,
}

impl AccessControl {
    /// An empty secret puts the gate in public (pass-through) mode.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: (!secret.is_empty()).then(|| Arc::from(secret)),
        }
    }

    pub fn is_public(&self) -> bool {
        self.secret.is_none()
    }

    /// Decide whether a request with these headers is admitted.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), GrabError> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(());
        };

        // Raw bytes: a non-ASCII secret is still an exact match.
        match headers.get(GRAB_TOKEN_HEADER) {
            Some(token) if token.as_bytes() == secret.as_bytes() => Ok(()),
            _ => Err(GrabError::Unauthorized),
        }
    }
}

pub async fn access_control_middleware(
    State(gate): State<AccessControl>,
    req: Request,
    next: Next,
) -> Response {
    match gate.check(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::warn!(path = %req.uri().path(), "Rejected request with missing or invalid token");
            e.into_response()
        }
    }
}
