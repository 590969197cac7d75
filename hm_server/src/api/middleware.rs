//! Authentication middleware for protected endpoints.
//!
//! Two guards share the Bearer-extraction plumbing:
//! - [`desktop_auth_middleware`] validates the delegated desktop identity
//!   token and injects [`DesktopClaims`] for the registration handler
//! - [`mobile_auth_middleware`] validates issued mobile bearer tokens and
//!   injects [`MobileClaims`] for resource handlers
//!
//! Both reject missing, malformed, or invalid credentials with
//! `401 { "error": ... }`. The mobile check is stateless: it trusts the
//! token signature alone and never consults the code registry.

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use harmony::pairing::{DesktopClaims, MobileClaims};

use super::AppState;
use super::pairing::ErrorResponse;
use crate::metrics;

type AuthRejection = (StatusCode, Json<ErrorResponse>);

fn unauthorized(message: &str) -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Middleware requiring a verified desktop identity token.
///
/// On success, [`DesktopClaims`] are added to request extensions for the
/// downstream handler.
pub async fn desktop_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return Err(unauthorized("Authentication required")),
    };

    match state.desktop_tokens.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert::<DesktopClaims>(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::debug!("rejected desktop identity token: {e}");
            Err(unauthorized(&e.client_message()))
        }
    }
}

/// Middleware requiring a valid mobile bearer token.
///
/// On success, [`MobileClaims`] are added to request extensions for the
/// downstream handler.
pub async fn mobile_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return Err(unauthorized("Authentication required")),
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            metrics::token_verifications_total(true);
            request.extensions_mut().insert::<MobileClaims>(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            metrics::token_verifications_total(false);
            tracing::debug!("rejected mobile bearer token: {e}");
            Err(unauthorized(&e.client_message()))
        }
    }
}
