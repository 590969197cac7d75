//! Resource endpoints available to paired mobile clients.
//!
//! Handlers here sit behind [`mobile_auth_middleware`] and read the
//! caller's identity from request extensions.
//!
//! [`mobile_auth_middleware`]: super::middleware::mobile_auth_middleware

use axum::{Json, extract::Extension};
use harmony::pairing::MobileClaims;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Identity of the calling mobile client, as carried by its bearer token.
///
/// # Example
///
/// ```bash
/// curl http://localhost:4000/api/mobile/me \
///   -H "Authorization: Bearer MOBILE_TOKEN"
/// # {"username":"alice","name":"Alice","email":"alice@example.com"}
/// ```
pub async fn me(Extension(claims): Extension<MobileClaims>) -> Json<MeResponse> {
    Json(MeResponse {
        username: claims.username,
        name: claims.name,
        email: claims.email,
    })
}
