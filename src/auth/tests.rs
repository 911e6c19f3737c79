//! Router-level tests for the auth module
//!
//! Each test builds its own app over a fresh in-memory database and drives it
//! with `oneshot` requests.

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;

use super::validators::{is_valid_email, LoginValidator, RegisterValidator};
use super::models::{LoginRequest, RegisterRequest};
use crate::common::test_support::{
    from_peer, json_request, send, test_app, test_app_with_limits, test_state, TestResponse,
};
use crate::common::Validator;
use crate::oauth::provider::ProviderKind;
use crate::services::RateLimitConfig;

const PASSWORD: &str = "Str0ng!Passw0rd";

fn with_cookie(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        "cookie",
        format!("refreshToken={}", token).parse().unwrap(),
    );
    request
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_me(access_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/me");
    if let Some(token) = access_token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &axum::Router, email: &str) -> TestResponse {
    send(
        app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "email": email, "password": PASSWORD, "name": "Test User" }),
        ),
    )
    .await
}

// ============================================================================
// Validators
// ============================================================================

#[test]
fn test_email_format() {
    assert!(is_valid_email("user@example.com"));
    assert!(is_valid_email("first.last+tag@sub.example.co"));
    assert!(!is_valid_email("user@localhost"));
    assert!(!is_valid_email("user example@example.com"));
    assert!(!is_valid_email("@example.com"));
}

#[test]
fn test_register_validator_collects_all_errors() {
    let request = RegisterRequest {
        email: Some("nope".to_string()),
        password: Some("short".to_string()),
        name: Some("x".repeat(101)),
    };
    let result = RegisterValidator.validate(&request);

    assert!(!result.is_valid);
    assert!(result.has_error("email"));
    assert!(result.has_error("password"));
    assert!(result.has_error("name"));
}

#[test]
fn test_register_validator_accepts_strong_input() {
    let request = RegisterRequest {
        email: Some("user@example.com".to_string()),
        password: Some(PASSWORD.to_string()),
        name: None,
    };
    assert!(RegisterValidator.validate(&request).is_valid);
}

#[test]
fn test_login_validator_only_checks_presence() {
    let weak_but_present = LoginRequest {
        email: Some("user@example.com".to_string()),
        password: Some("x".to_string()),
    };
    assert!(LoginValidator.validate(&weak_but_present).is_valid);

    let missing = LoginRequest::default();
    let result = LoginValidator.validate(&missing);
    assert!(result.has_error("email"));
    assert!(result.has_error("password"));
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = test_app(test_state().await);
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "status": "ok" }));
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_returns_token_user_and_cookie() {
    let app = test_app(test_state().await);
    let response = register(&app, "New.User@Example.com").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["accessToken"].as_str().unwrap().len() > 20);
    assert_eq!(response.body["user"]["email"], "new.user@example.com");
    assert_eq!(response.body["user"]["role"], "user");
    assert_eq!(response.body["user"]["name"], "Test User");
    assert!(response.body["user"].get("passwordHash").is_none());
    assert!(response.body["user"].get("password_hash").is_none());

    let cookie = response.set_cookie_header("refreshToken").unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert_eq!(response.cookie("refreshToken").unwrap().len(), 64);
}

#[tokio::test]
async fn test_register_duplicate_email_is_conflict() {
    let app = test_app(test_state().await);
    assert_eq!(register(&app, "dup@example.com").await.status, StatusCode::OK);

    let second = register(&app, "DUP@example.com").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["code"], "CONFLICT");
    assert!(second.cookie("refreshToken").is_none());
}

#[tokio::test]
async fn test_register_weak_password_lists_field_errors() {
    let app = test_app(test_state().await);
    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "email": "weak@example.com", "password": "alllowercase" }),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
    let fields = response.body["fields"].as_array().unwrap();
    assert!(fields.iter().all(|f| f["field"] == "password"));
    assert!(fields.len() >= 2);
}

#[tokio::test]
async fn test_long_strong_password_registers_and_logs_in() {
    let app = test_app(test_state().await);
    let password = format!("Aa1!{}", "b".repeat(200));

    let registered = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "email": "long@example.com", "password": password }),
        ),
    )
    .await;
    assert_eq!(registered.status, StatusCode::OK);

    let login = send(
        &app,
        json_request(
            "POST",
            "/auth/login",
            json!({ "email": "long@example.com", "password": password }),
        ),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = test_app(test_state().await);
    let password = format!("Aa1!{}", "b".repeat(100 * 1024));

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            json!({ "email": "huge@example.com", "password": password }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_malformed_json_is_bad_request() {
    let app = test_app(test_state().await);
    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_success_sets_cookie() {
    let app = test_app(test_state().await);
    register(&app, "login@example.com").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/login",
            json!({ "email": "  LOGIN@example.com ", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], "login@example.com");
    assert!(response.cookie("refreshToken").is_some());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let state = test_state().await;
    state
        .users
        .create("oauth-only@example.com", None, None)
        .await
        .unwrap();
    let app = test_app(state);
    register(&app, "known@example.com").await;

    let attempts = [
        json!({ "email": "known@example.com", "password": "WrongPass1" }),
        json!({ "email": "unknown@example.com", "password": PASSWORD }),
        json!({ "email": "oauth-only@example.com", "password": PASSWORD }),
    ];

    let mut messages = Vec::new();
    for body in attempts {
        let response = send(&app, json_request("POST", "/auth/login", body)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.cookie("refreshToken").is_none());
        messages.push(response.body["error"].clone());
    }

    assert!(messages.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_login_missing_fields_is_validation_error() {
    let app = test_app(test_state().await);
    let response = send(&app, json_request("POST", "/auth/login", json!({}))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = test_app(test_state().await);
    let response = send(&app, empty_post("/auth/refresh")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let app = test_app(test_state().await);
    let registered = register(&app, "rotate@example.com").await;
    let original = registered.cookie("refreshToken").unwrap();

    let first = send(&app, with_cookie(empty_post("/auth/refresh"), &original)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["user"]["email"], "rotate@example.com");
    assert!(first.body["accessToken"].is_string());
    let rotated = first.cookie("refreshToken").unwrap();
    assert_ne!(rotated, original);

    let reused = send(&app, with_cookie(empty_post("/auth/refresh"), &original)).await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);
    // The stale cookie is cleared
    assert_eq!(reused.cookie("refreshToken").as_deref(), Some(""));

    let next = send(&app, with_cookie(empty_post("/auth/refresh"), &rotated)).await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_unknown_token_is_unauthorized() {
    let app = test_app(test_state().await);
    let response = send(&app, with_cookie(empty_post("/auth/refresh"), "deadbeef")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_without_session_still_succeeds() {
    let app = test_app(test_state().await);
    let response = send(&app, empty_post("/auth/logout")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "status": "ok" }));
    let cleared = response.set_cookie_header("refreshToken").unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = test_app(test_state().await);
    let token = register(&app, "bye@example.com")
        .await
        .cookie("refreshToken")
        .unwrap();

    let first = send(&app, with_cookie(empty_post("/auth/logout"), &token)).await;
    assert_eq!(first.status, StatusCode::OK);

    let again = send(&app, with_cookie(empty_post("/auth/logout"), &token)).await;
    assert_eq!(again.status, StatusCode::OK);

    let refresh = send(&app, with_cookie(empty_post("/auth/refresh"), &token)).await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Me
// ============================================================================

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = test_app(test_state().await);

    assert_eq!(send(&app, get_me(None)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        send(&app, get_me(Some("not-a-jwt"))).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_me_returns_profile_and_linked_providers() {
    let state = test_state().await;
    let app = test_app(state.clone());
    let registered = register(&app, "me@example.com").await;
    let access_token = registered.body["accessToken"].as_str().unwrap().to_string();
    let user_id = registered.body["user"]["id"].as_str().unwrap().to_string();

    state
        .oauth_accounts
        .upsert(ProviderKind::Github, "777", "gho_x", &user_id)
        .await
        .unwrap();

    let response = send(&app, get_me(Some(&access_token))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], user_id.as_str());
    assert_eq!(response.body["email"], "me@example.com");
    assert_eq!(response.body["role"], "user");
    assert!(response.body["createdAt"].is_string());
    assert_eq!(response.body["providers"], json!(["github"]));
}

#[tokio::test]
async fn test_me_for_deleted_user_is_not_found() {
    let state = test_state().await;
    let app = test_app(state.clone());
    let registered = register(&app, "gone@example.com").await;
    let access_token = registered.body["accessToken"].as_str().unwrap().to_string();
    let user_id = registered.body["user"]["id"].as_str().unwrap().to_string();

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&user_id)
        .execute(&state.db)
        .await
        .unwrap();

    let response = send(&app, get_me(Some(&access_token))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Rate limiting
// ============================================================================

fn register_request(email: &str) -> Request<Body> {
    json_request(
        "POST",
        "/auth/register",
        json!({ "email": email, "password": PASSWORD }),
    )
}

fn forwarded_for(mut request: Request<Body>, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", value.parse().unwrap());
    request
}

#[tokio::test]
async fn test_register_rate_limit_per_ip() {
    let app = test_app(test_state().await);

    for i in 0..5 {
        let request = from_peer(register_request(&format!("flood{}@example.com", i)), "203.0.113.50");
        assert_eq!(send(&app, request).await.status, StatusCode::OK);
    }

    let blocked = from_peer(register_request("flood-extra@example.com"), "203.0.113.50");
    let response = send(&app, blocked).await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["code"], "RATE_LIMIT_EXCEEDED");
    assert!(response.body["retryAfter"].as_u64().unwrap() > 0);
    assert!(response.headers.get("retry-after").is_some());

    // Another client is unaffected
    let other = from_peer(register_request("other-ip@example.com"), "198.51.100.20");
    assert_eq!(send(&app, other).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_escape_register_limit() {
    let app = test_app(test_state().await);

    for i in 0..5 {
        let request = forwarded_for(
            from_peer(register_request(&format!("rotate{}@example.com", i)), "203.0.113.60"),
            &format!("10.9.{}.1", i),
        );
        assert_eq!(send(&app, request).await.status, StatusCode::OK);
    }

    let sixth = forwarded_for(
        from_peer(register_request("rotate-extra@example.com"), "203.0.113.60"),
        "10.9.99.1",
    );
    assert_eq!(send(&app, sixth).await.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_spoofed_whitelisted_address_is_still_limited() {
    let limits = RateLimitConfig {
        whitelist_ips: vec!["10.0.0.1".to_string()],
        ..RateLimitConfig::default()
    };
    let app = test_app_with_limits(test_state().await, limits);

    for i in 0..5 {
        let request = forwarded_for(
            from_peer(register_request(&format!("spoof{}@example.com", i)), "203.0.113.70"),
            "10.0.0.1",
        );
        assert_eq!(send(&app, request).await.status, StatusCode::OK);
    }

    let sixth = forwarded_for(
        from_peer(register_request("spoof-extra@example.com"), "203.0.113.70"),
        "10.0.0.1",
    );
    assert_eq!(send(&app, sixth).await.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_limits_each_forwarded_client() {
    let limits = RateLimitConfig {
        trusted_proxies: vec!["10.0.0.2".parse().unwrap()],
        ..RateLimitConfig::default()
    };
    let app = test_app_with_limits(test_state().await, limits);

    for i in 0..5 {
        let request = forwarded_for(
            from_peer(register_request(&format!("proxied{}@example.com", i)), "10.0.0.2"),
            "203.0.113.80",
        );
        assert_eq!(send(&app, request).await.status, StatusCode::OK);
    }

    let sixth = forwarded_for(
        from_peer(register_request("proxied-extra@example.com"), "10.0.0.2"),
        "203.0.113.80",
    );
    assert_eq!(send(&app, sixth).await.status, StatusCode::TOO_MANY_REQUESTS);

    // A different client behind the same proxy has its own window
    let neighbour = forwarded_for(
        from_peer(register_request("neighbour@example.com"), "10.0.0.2"),
        "203.0.113.81",
    );
    assert_eq!(send(&app, neighbour).await.status, StatusCode::OK);
}
