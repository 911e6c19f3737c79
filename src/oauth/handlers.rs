//! OAuth start / callback handlers

use axum::{
    extract::{Extension, Path, Query},
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::linking::complete_sign_in;
use super::provider::{OAuthError, ProviderKind};
use crate::auth::cookies::{
    cleared_oauth_state_cookie, oauth_state_cookie, refresh_cookie, OAUTH_STATE_COOKIE_NAME,
};
use crate::auth::RequestContext;
use crate::common::{ApiError, AppState};

const STATE_BYTES: usize = 16;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// GET /auth/oauth/:provider
///
/// Stores a random `state` in a signed cookie and redirects (302) to the
/// provider's authorization page.
pub async fn oauth_start(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind: ProviderKind = provider.parse()?;
    let adapter = state.providers.get(kind)?;

    let oauth_state = generate_state();
    let authorize_url = adapter.authorize_url(&oauth_state, &state.config.oauth_callback_url(kind));

    let jar = SignedCookieJar::from_headers(&headers, state.cookie_key.clone())
        .add(oauth_state_cookie(&oauth_state, state.config.production));

    info!(provider = %kind, "Redirecting to OAuth provider");

    Ok((StatusCode::FOUND, jar, [(LOCATION, authorize_url)]).into_response())
}

/// GET /auth/oauth/:provider/callback
///
/// Verifies `state`, completes the sign-in and redirects (302) to the web app's
/// completion page with the refresh cookie set.
pub async fn oauth_callback(
    Extension(state): Extension<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    ctx: RequestContext,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind: ProviderKind = provider.parse()?;
    let adapter = state.providers.get(kind)?;
    let secure = state.config.production;

    if let Some(error) = params.error {
        warn!(
            provider = %kind,
            oauth_error = %error,
            description = ?params.error_description,
            "Provider returned an authorization error"
        );
        return Err(OAuthError::Denied(error).into());
    }

    let code = params.code.filter(|c| !c.is_empty()).ok_or_else(|| {
        warn!(provider = %kind, "OAuth callback without authorization code");
        ApiError::BadRequest("Missing authorization code.".to_string())
    })?;

    let state_jar = SignedCookieJar::from_headers(&headers, state.cookie_key.clone());
    let expected = state_jar
        .get(OAUTH_STATE_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    match (expected, params.state) {
        (Some(expected), Some(received)) if expected == received => {}
        (expected, received) => {
            warn!(
                provider = %kind,
                has_cookie = expected.is_some(),
                has_param = received.is_some(),
                "OAuth state mismatch"
            );
            return Err(OAuthError::StateMismatch.into());
        }
    }

    let (_user, session) = complete_sign_in(&state, adapter.as_ref(), &code).await?;

    // The cleared state cookie goes through the plain jar so its empty value stays unsigned
    let jar = ctx
        .jar
        .add(cleared_oauth_state_cookie(secure))
        .add(refresh_cookie(&session.raw_token, session.expires_at, secure));

    Ok((
        StatusCode::FOUND,
        jar,
        [(LOCATION, state.config.oauth_completion_url())],
    )
        .into_response())
}
