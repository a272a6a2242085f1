//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream;
use grabid::config::GrabConfig;
use grabid::http::HttpServer;
use grabid::lifecycle::Shutdown;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const FILE_LEN: usize = 500;
pub const BIG_LEN: usize = 4096;
pub const SLOW_CHUNKS: usize = 20;
pub const SLOW_CHUNK_LEN: usize = 10;
pub const SLOW_CHUNK_DELAY: Duration = Duration::from_millis(50);

async fn file() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_LENGTH, "500"),
        ],
        vec![b'a'; FILE_LEN],
    )
}

async fn named() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"custom.dat\""),
        ],
        "named payload",
    )
}

async fn big() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "video/mp4")], vec![b'b'; BIG_LEN])
}

/// Chunked body with no declared length, larger than the test cap.
async fn r#unsized() -> impl IntoResponse {
    let chunks = (0..4).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b'u'; 600])));
    Body::from_stream(stream::iter(chunks))
}

async fn slow() -> impl IntoResponse {
    let chunks = stream::unfold(0usize, |sent| async move {
        if sent == SLOW_CHUNKS {
            return None;
        }
        tokio::time::sleep(SLOW_CHUNK_DELAY).await;
        Some((
            Ok::<_, std::io::Error>(Bytes::from(vec![b's'; SLOW_CHUNK_LEN])),
            sent + 1,
        ))
    });
    Body::from_stream(chunks)
}

/// Sends one chunk, then fails the body.
async fn reset() -> impl IntoResponse {
    let chunks = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "upstream reset")),
    ];
    Body::from_stream(stream::iter(chunks))
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_mock_upstream() -> SocketAddr {
    start_counting_upstream().await.0
}

/// Like [`start_mock_upstream`], also counting requests for `/files/slow.bin`.
pub async fn start_counting_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let slow_hits = Arc::new(AtomicUsize::new(0));
    let counter = slow_hits.clone();

    let app = Router::new()
        .route("/files/file.bin", get(file))
        .route("/files/named", get(named))
        .route("/files/big.mp4", get(big))
        .route("/files/unsized.bin", get(r#unsized))
        .route(
            "/files/slow.bin",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                slow()
            }),
        )
        .route("/files/reset.bin", get(reset))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, slow_hits)
}

/// A config with a 1KB cap and a rate limit loose enough to stay out of the way.
pub fn test_config() -> GrabConfig {
    let mut config = GrabConfig::default();
    config.listener.bind_address = "127.0.0.1".to_string();
    config.limits.max_size = "1KB".to_string();
    config.limits.max_concurrent = 5;
    config.rate_limit.limit = "100-100".to_string();
    config
}

/// Start the server on an ephemeral port. Trigger the returned handle to stop it.
pub async fn start_server(config: GrabConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub fn url(upstream: SocketAddr, path: &str) -> String {
    format!("http://{}{}", upstream, path)
}
