//! HTTP API for the mobile pairing service.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP
//! - **Tower**: Middleware for CORS
//! - **JWT**: Stateless bearer tokens for paired mobile clients
//!
//! # Modules
//!
//! - [`pairing`]: Code registration and redemption endpoints
//! - [`workspace`]: Resource endpoints available to paired clients
//! - [`middleware`]: Desktop and mobile authentication middleware
//! - [`rate_limiter`]: Per-address throttling of the public redemption endpoint
//! - [`request_id`]: Request ID propagation for log correlation
//!
//! # Endpoints Overview
//!
//! - `POST /api/mobile/register-code` - Register a connection code (desktop auth)
//! - `POST /api/mobile/connect` - Redeem a code for a mobile token (public, rate limited)
//! - `GET  /api/mobile/me` - Identity of the calling mobile client (mobile auth)
//! - `GET  /api/health` - Health check (public)
//!
//! # Security
//!
//! - Connection codes are single-use and expire within minutes
//! - Mobile tokens expire after 30 days; there is no server-side revocation
//! - Unknown and expired codes produce one indistinguishable error message
//! - CORS is configured permissively for development

pub mod middleware;
pub mod pairing;
pub mod rate_limiter;
pub mod request_id;
pub mod workspace;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use harmony::pairing::{CodeRegistry, DesktopTokenVerifier, TokenManager};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use rate_limiter::ConnectRateLimiter;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
///
/// # Fields
///
/// - `registry`: Live connection codes
/// - `tokens`: Mobile token issuing and verification
/// - `desktop_tokens`: Delegated desktop identity token verification
/// - `connect_limiter`: Per-address throttle on the redemption endpoint
/// - `config`: Validated server configuration
#[derive(Clone)]
pub struct AppState {
    pub registry: CodeRegistry,
    pub tokens: Arc<TokenManager>,
    pub desktop_tokens: Arc<DesktopTokenVerifier>,
    pub connect_limiter: Arc<ConnectRateLimiter>,
    pub config: Arc<ServerConfig>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /api/health                  - Health check (public)
/// POST /api/mobile/register-code    - Register code (desktop auth)
/// POST /api/mobile/connect          - Redeem code (public, rate limited)
/// GET  /api/mobile/me               - Caller identity (mobile auth)
/// ```
pub fn create_router(state: AppState) -> Router {
    // Registration requires a verified desktop identity token.
    let desktop_routes = Router::new()
        .route("/api/mobile/register-code", post(pairing::register_code))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::desktop_auth_middleware,
        ));

    // Redemption is unauthenticated but throttled per client address.
    let connect_routes = Router::new()
        .route("/api/mobile/connect", post(pairing::connect))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limiter::connect_rate_limit_middleware,
        ));

    // Resource endpoints require a valid mobile bearer token.
    let mobile_routes = Router::new()
        .route("/api/mobile/me", get(workspace::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::mobile_auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(health_check))
        .merge(desktop_routes)
        .merge(connect_routes)
        .merge(mobile_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Reports the number of live, unredeemed connection codes.
///
/// # Example
///
/// ```bash
/// curl http://localhost:4000/api/health
/// # {"status":"ok","activeCodes":2}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.registry.size().await;
    crate::metrics::active_connection_codes(active);

    Json(json!({
        "status": "ok",
        "activeCodes": active,
    }))
}
