//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the three API endpoints
//! - Wire up middleware (request ID, tracing, admission gate, rate limit)
//! - Own the shared state: upstream client, stream slots, rate limiter
//! - Run the rate-limiter sweeper alongside the server
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GrabConfig;
use crate::error::ServerError;
use crate::http::info::info_handler;
use crate::http::probe::probe_handler;
use crate::http::request::{request_id, MakeGrabRequestId};
use crate::http::stream::stream_handler;
use crate::lifecycle::Shutdown;
use crate::security::{
    access_control_middleware, rate_limit_middleware, AccessControl, ClientRateLimiter, StreamSlots,
};
use crate::upstream::UpstreamClient;

pub const PROBE_PATH: &str = "/api/v1/probe";
pub const STREAM_PATH: &str = "/api/v1/stream";
pub const INFO_PATH: &str = "/api/v1/info";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GrabConfig>,
    pub upstream: UpstreamClient,
    pub slots: StreamSlots,
    /// Size cap in bytes, resolved once from `limits.max_size`.
    pub max_size: u64,
}

/// HTTP server for the streamer.
pub struct HttpServer {
    router: Router,
    config: Arc<GrabConfig>,
    limiter: Arc<ClientRateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GrabConfig) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let upstream = UpstreamClient::new(&config.upstream)?;
        let slots = StreamSlots::new(config.limits.max_concurrent);
        let limiter = Arc::new(ClientRateLimiter::new(
            config.rate_limit.spec(),
            config.rate_limit.idle_ttl(),
        ));
        let access = AccessControl::new(&config.auth.secret);

        if access.is_public() {
            tracing::warn!("Running in PUBLIC mode, no token required");
        } else {
            tracing::info!("Running in SECURE mode, X-Grab-Token required");
        }

        let state = AppState {
            config: config.clone(),
            upstream,
            slots,
            max_size: config.limits.max_size_bytes(),
        };

        let router = Self::build_router(state, access, limiter.clone());
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Order for a stream request: request ID → trace → token → rate → handler.
    fn build_router(state: AppState, access: AccessControl, limiter: Arc<ClientRateLimiter>) -> Router {
        let stream_route = any(stream_handler)
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        Router::new()
            .route(PROBE_PATH, any(probe_handler))
            .route(STREAM_PATH, stream_route)
            .route(INFO_PATH, get(info_handler))
            .layer(middleware::from_fn_with_state(access, access_control_middleware))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeGrabRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request.headers()),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns once `shutdown` fires and in-flight requests have drained.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_size = %self.config.limits.max_size_label(),
            max_concurrent = self.config.limits.max_concurrent,
            "HTTP server starting"
        );

        let sweeper = self
            .limiter
            .spawn_sweeper(self.config.rate_limit.sweep_interval(), shutdown.subscribe());

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Rate limiter sweeper ended abnormally");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GrabConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    fn server(secret: &str) -> HttpServer {
        let mut config = GrabConfig::default();
        config.auth.secret = secret.to_string();
        config.limits.max_size = "2MB".to_string();
        config.limits.max_concurrent = 3;
        HttpServer::new(config).unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_info_reports_limits() {
        let response = server("")
            .router()
            .oneshot(request(Method::GET, INFO_PATH))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let info: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(info, serde_json::json!({"max_size_limit": "2MB", "max_concurrent": 3}));
    }

    #[tokio::test]
    async fn test_token_checked_before_method() {
        let router = server("s3cret").router();

        let response = router
            .clone()
            .oneshot(request(Method::POST, STREAM_PATH))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut authorized = request(Method::POST, STREAM_PATH);
        authorized
            .headers_mut()
            .insert("x-grab-token", "s3cret".parse().unwrap());
        let response = router.oneshot(authorized).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_url_rejected() {
        let router = server("").router();

        for path in [PROBE_PATH, STREAM_PATH] {
            let response = router
                .clone()
                .oneshot(request(Method::GET, path))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_probe_rejects_post() {
        let response = server("")
            .router()
            .oneshot(request(Method::POST, "/api/v1/probe?url=http://example.com/a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_stream_only() {
        let mut config = GrabConfig::default();
        config.rate_limit.limit = "1-1".to_string();
        let router = HttpServer::new(config).unwrap().router();

        // No ConnectInfo in oneshot; every request shares the "unknown" key.
        let first = router
            .clone()
            .oneshot(request(Method::GET, STREAM_PATH))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);

        let second = router
            .clone()
            .oneshot(request(Method::GET, STREAM_PATH))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let probe = router.oneshot(request(Method::GET, PROBE_PATH)).await.unwrap();
        assert_eq!(probe.status(), StatusCode::BAD_REQUEST);
    }
}
