//! Integration tests for the pairing HTTP surface.
//!
//! Drives the full router in-process: code registration, redemption,
//! protected resources, throttling, and error shapes.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use harmony::pairing::{CodeRegistry, DesktopTokenVerifier, TokenManager};
use hm_server::api::{self, AppState, rate_limiter::ConnectRateLimiter};
use hm_server::config::{PairingConfig, SecurityConfig, ServerConfig};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method

const MOBILE_SECRET: &str = "mobile_test_secret_key_for_testing_only";
const DESKTOP_SECRET: &str = "desktop_test_secret_key_for_testing_only";
const DESKTOP_ISSUER: &str = "conductor-web";
const API_URL: &str = "http://pairing.test";

fn test_config() -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        metrics_bind: None,
        api_url: API_URL.to_string(),
        security: SecurityConfig {
            mobile_jwt_secret: MOBILE_SECRET.to_string(),
            desktop_jwt_secret: DESKTOP_SECRET.to_string(),
            desktop_token_issuer: DESKTOP_ISSUER.to_string(),
        },
        pairing: PairingConfig {
            default_code_ttl_secs: 600,
            max_code_ttl_secs: 3600,
            sweep_interval_secs: 60,
            connect_rate_limit: 50,
            connect_rate_window_secs: 60,
        },
    }
}

/// Helper to create a test router over fresh state
fn create_test_server(config: ServerConfig) -> Router {
    let state = AppState {
        registry: CodeRegistry::new(),
        tokens: Arc::new(TokenManager::new(config.security.mobile_jwt_secret.clone())),
        desktop_tokens: Arc::new(DesktopTokenVerifier::new(
            config.security.desktop_jwt_secret.clone(),
            config.security.desktop_token_issuer.clone(),
        )),
        connect_limiter: Arc::new(ConnectRateLimiter::new(
            config.pairing.connect_rate_limit,
            Duration::from_secs(config.pairing.connect_rate_window_secs),
        )),
        config: Arc::new(config),
    };
    api::create_router(state)
}

/// Mint a desktop identity token the way the dashboard would
fn desktop_token(username: &str) -> String {
    let claims = json!({
        "sub": username,
        "username": username,
        "name": format!("{username} Display"),
        "email": format!("{username}@conductor.test"),
        "iss": DESKTOP_ISSUER,
        "exp": (Utc::now() + chrono::Duration::minutes(15)).timestamp(),
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(DESKTOP_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Generate unique code for tests
fn unique_code(prefix: &str) -> String {
    let rand_id: u32 = rand::random();
    format!("{}{}", prefix, rand_id % 100000)
}

async fn post_json(
    app: &Router,
    uri: &str,
    auth: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(app: &Router, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, code: &str, username: &str, expires_in: i64) -> (StatusCode, Value) {
    post_json(
        app,
        "/api/mobile/register-code",
        Some(&format!("Bearer {}", desktop_token(username))),
        json!({ "code": code, "username": username, "expiresIn": expires_in }),
    )
    .await
}

async fn connect(app: &Router, code: &str) -> (StatusCode, Value) {
    post_json(app, "/api/mobile/connect", None, json!({ "code": code })).await
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_server(test_config());

    let (status, body) = get_json(&app, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeCodes"], 0);
}

#[tokio::test]
async fn test_health_counts_live_codes() {
    let app = create_test_server(test_config());

    register(&app, &unique_code("H"), "alice", 600).await;
    register(&app, &unique_code("H"), "bob", 600).await;

    let (status, body) = get_json(&app, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeCodes"], 2);
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_requires_auth() {
    let app = create_test_server(test_config());
    let body = json!({ "code": "ABC123", "username": "alice", "expiresIn": 600 });

    let (status, value) = post_json(&app, "/api/mobile/register-code", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(value["error"].is_string());

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some("NotBearer abc"),
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some("Bearer not.a.token"),
        body,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_wrong_issuer_token() {
    let app = create_test_server(test_config());

    let claims = json!({
        "sub": "alice",
        "username": "alice",
        "name": "Alice Display",
        "email": "alice@conductor.test",
        "iss": "someone-else",
        "exp": (Utc::now() + chrono::Duration::minutes(15)).timestamp(),
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(DESKTOP_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some(&format!("Bearer {token}")),
        json!({ "code": "ABC123", "username": "alice", "expiresIn": 600 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = create_test_server(test_config());
    let auth = format!("Bearer {}", desktop_token("alice"));

    let (status, body) = post_json(&app, "/api/mobile/register-code", Some(&auth), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some(&auth),
        json!({ "code": "ABC123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some(&auth),
        json!({ "code": "  ", "username": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/api/mobile/register-code",
        Some(&auth),
        json!({ "code": "ABC123", "username": "alice", "expiresIn": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_clamps_requested_ttl() {
    let app = create_test_server(test_config());
    let code = unique_code("CLAMP");

    let before = Utc::now();
    let (status, body) = register(&app, &code, "alice", 999_999).await;
    assert_eq!(status, StatusCode::OK);

    let expires_at: DateTime<Utc> = body["expiresAt"]
        .as_str()
        .unwrap()
        .parse()
        .expect("expiresAt should be RFC 3339");

    // Clamped to the configured 3600s maximum.
    let ttl = (expires_at - before).num_seconds();
    assert!(ttl <= 3600 + 5, "TTL was not clamped: {ttl}s");
    assert!(ttl >= 3600 - 5, "TTL clamped too far: {ttl}s");
}

// ============================================================================
// Pairing Flow Tests
// ============================================================================

#[tokio::test]
async fn test_register_and_connect_flow() {
    let app = create_test_server(test_config());

    let (status, body) = register(&app, "ABC123", "alice", 600).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "ABC123");
    assert!(body["expiresAt"].as_str().unwrap().parse::<DateTime<Utc>>().is_ok());

    let (status, body) = connect(&app, "ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["name"], "alice Display");
    assert_eq!(body["email"], "alice@conductor.test");
    assert_eq!(body["apiUrl"], API_URL);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    // Redemption consumed the code.
    let (_, health) = get_json(&app, "/api/health", None).await;
    assert_eq!(health["activeCodes"], 0);

    // The issued token opens protected endpoints.
    let (status, body) = get_json(&app, "/api/mobile/me", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["name"], "alice Display");
    assert_eq!(body["email"], "alice@conductor.test");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = create_test_server(test_config());

    register(&app, "ABC123", "alice", 600).await;

    let (status, _) = connect(&app, "ABC123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = connect(&app, "ABC123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired connection code");
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let app = create_test_server(test_config());

    let (status, _) = register(&app, "XYZ999", "alice", 1).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let (status, body) = connect(&app, "XYZ999").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired connection code");
}

#[tokio::test]
async fn test_unknown_code_and_expired_code_are_indistinguishable() {
    let app = create_test_server(test_config());

    register(&app, "GONE1", "alice", 1).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let (_, expired_body) = connect(&app, "GONE1").await;
    let (_, unknown_body) = connect(&app, "NEVER_EXISTED").await;
    assert_eq!(expired_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn test_reregistration_overwrites_identity() {
    let app = create_test_server(test_config());

    register(&app, "DUP111", "alice", 600).await;
    register(&app, "DUP111", "bob", 600).await;

    let (status, body) = connect(&app, "DUP111").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn test_connect_missing_code() {
    let app = create_test_server(test_config());

    let (status, body) = post_json(&app, "/api/mobile/connect", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing connection code");

    let (status, _) = post_json(&app, "/api/mobile/connect", None, json!({ "code": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Protected Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_test_server(test_config());

    let (status, _) = get_json(&app, "/api/mobile/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_json(&app, "/api/mobile/me", Some("NotBearer abc")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_json(&app, "/api/mobile/me", Some("Bearer garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_desktop_token_is_rejected_on_mobile_routes() {
    let app = create_test_server(test_config());

    let (status, _) = get_json(
        &app,
        "/api/mobile/me",
        Some(&format!("Bearer {}", desktop_token("alice"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_mobile_token_rejected() {
    let app = create_test_server(test_config());

    let issued_at = Utc::now() - chrono::Duration::days(31);
    let claims = json!({
        "sub": "alice",
        "username": "alice",
        "name": "Alice Display",
        "email": "alice@conductor.test",
        "tokenType": "mobile",
        "iat": issued_at.timestamp(),
        "exp": (issued_at + chrono::Duration::days(30)).timestamp(),
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(MOBILE_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = get_json(&app, "/api/mobile/me", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_404_for_invalid_endpoint() {
    let app = create_test_server(test_config());

    let (status, _) = get_json(&app, "/api/invalid/endpoint", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_request() {
    let app = create_test_server(test_config());

    let request = Request::builder()
        .method("POST")
        .uri("/api/mobile/connect")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ invalid json }"))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY,
        "Malformed JSON should return 400 or 422"
    );
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_connects_yield_single_success() {
    let app = create_test_server(test_config());
    let code = unique_code("RACE");

    register(&app, &code, "alice", 600).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app_clone = app.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            connect(&app_clone, &code).await.0
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        if handle.await.expect("Task should complete") == StatusCode::OK {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 1, "Exactly one redemption should succeed");
}

// ============================================================================
// Rate Limiting Tests
// ============================================================================

#[tokio::test]
async fn test_connect_rate_limited() {
    let mut config = test_config();
    config.pairing.connect_rate_limit = 5;
    let app = create_test_server(config);

    // In-process requests share one bucket, so the 6th attempt trips it.
    for _ in 0..5 {
        let (status, _) = connect(&app, "WHATEVER").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = connect(&app, "WHATEVER").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}
