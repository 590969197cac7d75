//! Pairing API handlers.
//!
//! This module provides the two halves of the pairing handshake:
//! - The desktop registers a short connection code while authenticated
//! - The mobile app exchanges the code once, unauthenticated, for a
//!   long-lived bearer token
//!
//! All endpoints return JSON responses with either pairing data or error
//! messages.
//!
//! # Examples
//!
//! Register a code (desktop, authenticated):
//! ```bash
//! curl -X POST http://localhost:4000/api/mobile/register-code \
//!   -H "Authorization: Bearer DESKTOP_TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"code": "ABC123", "username": "alice", "expiresIn": 600}'
//! ```
//!
//! Connect (mobile, unauthenticated):
//! ```bash
//! curl -X POST http://localhost:4000/api/mobile/connect \
//!   -H "Content-Type: application/json" \
//!   -d '{"code": "ABC123"}'
//! ```

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};
use chrono::SecondsFormat;
use harmony::pairing::{DesktopClaims, Identity};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::logging::log_security_event;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RegisterCodePayload {
    pub code: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "expiresIn")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RegisterCodeResponse {
    pub success: bool,
    pub code: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectPayload {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub token: String,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "apiUrl")]
    pub api_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Register a connection code for the authenticated desktop user.
///
/// Stores the caller's identity snapshot under the supplied code. The code
/// can then be entered (or scanned) on a mobile device and exchanged for a
/// bearer token exactly once before it expires.
///
/// # Request Body
///
/// ```json
/// {
///   "code": "ABC123",
///   "username": "alice",
///   "expiresIn": 600  // Optional, seconds; clamped to the configured max
/// }
/// ```
///
/// # Response
///
/// On success, returns `200 OK`:
/// ```json
/// {
///   "success": true,
///   "code": "ABC123",
///   "expiresAt": "2026-08-05T12:34:56.789Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing code or username, or non-positive `expiresIn`
/// - `401 Unauthorized`: Missing or invalid desktop identity token
pub async fn register_code(
    State(state): State<AppState>,
    Extension(claims): Extension<DesktopClaims>,
    Json(payload): Json<RegisterCodePayload>,
) -> Result<Json<RegisterCodeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let code = match payload.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => return Err(bad_request("Missing connection code")),
    };
    let username = match payload.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => username.to_string(),
        _ => return Err(bad_request("Missing username")),
    };

    let requested = payload
        .expires_in
        .unwrap_or(state.config.pairing.default_code_ttl_secs);
    if requested <= 0 {
        return Err(bad_request("expiresIn must be a positive number of seconds"));
    }
    let ttl = requested.min(state.config.pairing.max_code_ttl_secs);

    // Identity snapshot taken now; later profile changes are not reflected.
    let identity = Identity {
        username,
        display_name: claims.name.clone(),
        email: claims.email.clone(),
    };

    let expires_at = state.registry.register(&code, identity, ttl).await;
    metrics::codes_registered_total();
    metrics::active_connection_codes(state.registry.size().await);
    info!(username = %claims.username, ttl, "registered mobile connection code");

    Ok(Json(RegisterCodeResponse {
        success: true,
        code,
        expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Exchange a connection code for a mobile bearer token.
///
/// Redemption consumes the code: a second attempt with the same code fails
/// identically to an unknown code.
///
/// # Request Body
///
/// ```json
/// { "code": "ABC123" }
/// ```
///
/// # Response
///
/// On success, returns `200 OK`:
/// ```json
/// {
///   "success": true,
///   "token": "eyJhbGciOiJIUzI1NiIs...",
///   "username": "alice",
///   "name": "Alice",
///   "email": "alice@example.com",
///   "apiUrl": "https://harmony.example.com"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing code, or unknown/expired code (the two are
///   deliberately indistinguishable)
/// - `429 Too Many Requests`: Client address exceeded the attempt window
pub async fn connect(
    State(state): State<AppState>,
    Json(payload): Json<ConnectPayload>,
) -> Result<Json<ConnectResponse>, (StatusCode, Json<ErrorResponse>)> {
    let code = match payload.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => return Err(bad_request("Missing connection code")),
    };

    let identity = match state.registry.redeem(&code).await {
        Ok(identity) => identity,
        Err(e) => {
            metrics::codes_redeemed_total(false);
            log_security_event(
                "code_redemption_failed",
                None,
                None,
                "Rejected mobile connection attempt",
            );
            return Err(bad_request(&e.client_message()));
        }
    };

    let token = state.tokens.issue(&identity).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.client_message(),
            }),
        )
    })?;

    metrics::codes_redeemed_total(true);
    metrics::active_connection_codes(state.registry.size().await);
    info!(username = %identity.username, "mobile client paired");

    Ok(Json(ConnectResponse {
        success: true,
        token,
        username: identity.username,
        name: identity.display_name,
        email: identity.email,
        api_url: state.config.api_url.clone(),
    }))
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
