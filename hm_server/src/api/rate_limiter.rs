//! Rate limiter for the public redemption endpoint.
//!
//! `/api/mobile/connect` is unauthenticated and accepts short, guessable
//! codes, so attempts are bounded per client address with a sliding window.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;

use super::AppState;
use super::pairing::ErrorResponse;
use crate::logging::log_security_event;
use crate::metrics;

/// Map size above which fully-idle address windows are pruned.
const IDLE_PRUNE_THRESHOLD: usize = 1024;

/// Per-address sliding window over redemption attempts.
pub struct ConnectRateLimiter {
    /// Maximum attempts allowed per address in the window
    max_attempts: usize,
    /// Time window for rate limiting
    window: Duration,
    /// Attempt timestamps per client address
    attempts: RwLock<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl ConnectRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Attempts allowed per address in the time window
    /// * `window` - Time window duration
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Record an attempt from `addr`.
    ///
    /// Returns `true` if the attempt is allowed, `false` once the window
    /// for this address is full.
    pub async fn check(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;

        // Keep the map bounded: drop addresses idle for a full window.
        if attempts.len() >= IDLE_PRUNE_THRESHOLD {
            let window = self.window;
            attempts.retain(|_, timestamps| {
                timestamps
                    .back()
                    .is_some_and(|ts| now.duration_since(*ts) <= window)
            });
        }

        let timestamps = attempts.entry(addr).or_default();

        // Remove timestamps outside the window
        while let Some(ts) = timestamps.front() {
            if now.duration_since(*ts) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_attempts {
            return false;
        }

        timestamps.push_back(now);
        true
    }
}

/// Route-scoped middleware bounding redemption attempts per client address.
///
/// Exceeding the window returns `429 { "error": ... }`.
pub async fn connect_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let addr = client_addr(&request);

    if !state.connect_limiter.check(addr).await {
        metrics::rate_limit_hits_total("/api/mobile/connect");
        log_security_event(
            "connect_rate_limited",
            None,
            Some(&addr.to_string()),
            "Throttled mobile connection attempts",
        );
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Too many connection attempts, please try again later".to_string(),
            }),
        ));
    }

    Ok(next.run(request).await)
}

/// Client address, when the listener provides one.
///
/// In-process test routers carry no peer address; those requests share a
/// single bucket.
fn client_addr(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
