//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /health` - Liveness check
/// - `POST /auth/register` - Email/password sign-up
/// - `POST /auth/login` - Email/password sign-in
/// - `POST /auth/refresh` - Rotate the refresh session, mint a new access token
/// - `POST /auth/logout` - Revoke the refresh session
/// - `GET /me` - Current user profile
pub fn auth_routes() -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/me", get(handlers::me_handler))
}
