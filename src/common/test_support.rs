// Shared fixtures for unit and router tests

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header::SET_COOKIE, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use super::migrations::run_migrations;
use super::{AppConfig, AppState};
use crate::oauth::ProviderRegistry;
use crate::services::{RateLimitConfig, RateLimitService};

/// Fresh in-memory database with the schema applied
///
/// A single never-recycled connection keeps the in-memory database alive for
/// the lifetime of the pool.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// File-backed database shared by `max_connections` connections
///
/// Keep the returned directory alive for as long as the pool is used.
pub async fn file_pool(max_connections: u32) -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("auth.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    (pool, dir)
}

pub async fn test_state_with(config: AppConfig, providers: ProviderRegistry) -> Arc<AppState> {
    Arc::new(AppState::new(test_pool().await, config, providers))
}

pub async fn test_state() -> Arc<AppState> {
    test_state_with(AppConfig::default(), ProviderRegistry::default()).await
}

pub fn test_app(state: Arc<AppState>) -> Router {
    test_app_with_limits(state, RateLimitConfig::default())
}

pub fn test_app_with_limits(state: Arc<AppState>, limits: RateLimitConfig) -> Router {
    crate::build_router(state, Arc::new(RateLimitService::new(limits)))
}

/// Attach the socket address the server would have recorded for this request
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{}:40000", peer).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of the `name` cookie set by this response, if any
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(|v| {
                v[prefix.len()..]
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }

    /// Full Set-Cookie header for `name`
    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
