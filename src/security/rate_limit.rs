//! Per-client rate limiting with idle eviction.
//!
//! One token bucket per client IP, all sharing the configured rate and burst.
//! The whole table sits behind a single mutex; lookups and the periodic sweep
//! both take it. The sweep is the only thing that bounds the table's size.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RateSpec;
use crate::error::GrabError;
use crate::http::request::client_ip;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Token-bucket limiter keyed by client IP.
#[derive(Debug)]
pub struct ClientRateLimiter {
    clients: Mutex<HashMap<String, ClientEntry>>,
    rate: f64,
    burst: f64,
    idle_ttl: Duration,
}

impl ClientRateLimiter {
    pub fn new(spec: RateSpec, idle_ttl: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            rate: f64::from(spec.rate),
            burst: f64::from(spec.burst),
            idle_ttl,
        }
    }

    /// Take one token for `client`. Never blocks.
    ///
    /// The entry's last-seen time is refreshed even when the request is denied.
    pub fn acquire(&self, client: &str) -> bool {
        self.acquire_at(client, Instant::now())
    }

    fn acquire_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.lock();
        let entry = clients
            .entry(client.to_string())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(self.burst, now),
                last_seen: now,
            });
        entry.last_seen = now;
        entry.bucket.try_acquire(self.burst, self.rate, now)
    }

    /// Drop every client idle for longer than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_ttl);
        let removed = before - clients.len();
        metrics::record_rate_limiter_clients(clients.len());
        removed
    }

    /// Number of client entries currently held.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Run [`sweep`](Self::sweep) every `every` until `shutdown` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                remaining = limiter.tracked_clients(),
                                "Evicted idle rate-limit entries"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate-limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        // The map holds no invariants a panicking holder could break.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Middleware enforcing the per-client limit.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(request.headers(), peer);

    if limiter.acquire(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        GrabError::RateLimited.into_response()
    }
}
