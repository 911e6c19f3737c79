//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// # Routes
/// - `GET /auth/oauth/:provider` - Redirect to the provider
/// - `GET /auth/oauth/:provider/callback` - Provider redirect target
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/auth/oauth/:provider", get(handlers::oauth_start))
        .route("/auth/oauth/:provider/callback", get(handlers::oauth_callback))
}
