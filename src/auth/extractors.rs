//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cookies::REFRESH_COOKIE_NAME;
use super::models::Identity;
use crate::common::{safe_email_log, ApiError, AppState};

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<Arc<AppState>, ApiError> {
    let Extension(app_state): Extension<Arc<AppState>> = Extension::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;
    Ok(app_state)
}

/// Per-request authentication context
///
/// Carries the incoming cookie jar, the raw refresh token (if the cookie is set)
/// and the identity from a valid `Authorization: Bearer` header. Never rejects
/// on missing or bad credentials; handlers decide what they require.
#[derive(Debug)]
pub struct RequestContext {
    pub jar: CookieJar,
    pub refresh_token: Option<String>,
    pub identity: Option<Identity>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        let jar = CookieJar::from_headers(&parts.headers);
        let refresh_token = jar
            .get(REFRESH_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());

        let identity = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| app_state.tokens.parse_bearer_authorization(v));

        Ok(RequestContext {
            jar,
            refresh_token,
            identity,
        })
    }
}

/// Authenticated caller extractor
///
/// Rejects with 401 unless the request carries a valid, unexpired bearer token.
/// Does not touch the database; the token alone establishes identity.
#[derive(Debug)]
pub struct AuthedUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;

        let header = match parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
            Some(h) => h,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("Authentication required.".into()));
            }
        };

        match app_state.tokens.parse_bearer_authorization(header) {
            Some(identity) => {
                debug!(
                    user_id = %identity.user_id,
                    email = %safe_email_log(&identity.email),
                    "Bearer token accepted"
                );
                Ok(AuthedUser(identity))
            }
            None => {
                warn!("Authentication failed: invalid or expired access token");
                Err(ApiError::Unauthorized("Invalid or expired token.".into()))
            }
        }
    }
}
