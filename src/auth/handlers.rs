//! Authentication handlers

use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::cookies::{cleared_refresh_cookie, refresh_cookie};
use super::extractors::{AuthedUser, RequestContext};
use super::models::{
    AuthResponse, LoginRequest, MeResponse, PublicUser, RegisterRequest, StatusResponse, User,
};
use super::password::{hash_password, verify_dummy, verify_password};
use super::sessions::SessionError;
use super::store::is_unique_violation;
use super::validators::{LoginValidator, RegisterValidator};
use crate::common::{normalize_email, safe_email_log, ApiError, AppState, Validator};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const EMAIL_TAKEN: &str = "An account with this email already exists.";
const NO_ACTIVE_SESSION: &str = "No active session.";

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        ApiError::BadRequest("Request body must be valid JSON.".to_string())
    })
}

/// Issue an access token and a refresh session for `user` and set the cookie
async fn sign_in(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let session = state.sessions.issue_session(&user.id).await?;
    let access_token = state.tokens.issue_access_token(user)?;

    let jar = jar.add(refresh_cookie(
        &session.raw_token,
        session.expires_at,
        state.config.production,
    ));

    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            user: PublicUser::from(user),
        }),
    ))
}

/// Verify against a placeholder hash so a failed lookup costs as much as a wrong password
async fn burn_verification(password: String) {
    if let Err(e) = tokio::task::spawn_blocking(move || verify_dummy(&password)).await {
        warn!(error = %e, "Placeholder password verification task failed");
    }
}

/// GET /health
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

/// POST /auth/register
///
/// # Request Body
/// ```json
/// { "email": "user@example.com", "password": "Str0ngPass", "name": "Optional" }
/// ```
///
/// # Response
/// `{ "accessToken": "...", "user": { "id", "email", "name", "role" } }` plus the
/// `refreshToken` cookie.
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    ctx: RequestContext,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let body = json_body(payload)?;
    RegisterValidator.validate(&body).into_result()?;

    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    let password = body.password.unwrap_or_default();
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    if state.users.find_by_email(&email).await?.is_some() {
        info!(email = %safe_email_log(&email), "Registration rejected: email already registered");
        return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::InternalServer(format!("password hashing task failed: {}", e)))?
        .map_err(ApiError::InternalServer)?;

    let user = match state
        .users
        .create(&email, name.as_deref(), Some(&password_hash))
        .await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            info!(email = %safe_email_log(&email), "Registration lost race for email");
            return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User registered"
    );

    sign_in(&state, ctx.jar, &user).await
}

/// POST /auth/login
///
/// Unknown email, OAuth-only account and wrong password all produce the same 401.
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    ctx: RequestContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let body = json_body(payload)?;
    LoginValidator.validate(&body).into_result()?;

    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    let password = body.password.unwrap_or_default();

    let user = match state.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            burn_verification(password).await;
            info!(email = %safe_email_log(&email), "Login failed: unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let Some(stored_hash) = user.password_hash.clone() else {
        burn_verification(password).await;
        info!(user_id = %user.id, "Login failed: account has no password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::InternalServer(format!("password verification task failed: {}", e)))?;

    match verified {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Login failed: wrong password");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    }

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );

    sign_in(&state, ctx.jar, &user).await
}

/// POST /auth/refresh
///
/// Rotates the refresh session named by the cookie. A stale cookie is cleared
/// on the 401.
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let secure = state.config.production;

    let Some(raw_token) = ctx.refresh_token else {
        debug!("Refresh rejected: no refresh cookie");
        return Err(ApiError::Unauthorized(NO_ACTIVE_SESSION.to_string()));
    };

    let rotated = match state.sessions.rotate_session(&raw_token).await {
        Ok(rotated) => rotated,
        Err(SessionError::Invalid) => {
            let jar = ctx.jar.add(cleared_refresh_cookie(secure));
            return Ok((jar, ApiError::from(SessionError::Invalid)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let Some(user) = state.users.find_by_id(&rotated.user_id).await? else {
        warn!(user_id = %rotated.user_id, "Refresh session belongs to a missing user");
        let jar = ctx.jar.add(cleared_refresh_cookie(secure));
        return Ok((jar, ApiError::from(SessionError::Invalid)).into_response());
    };

    let access_token = state.tokens.issue_access_token(&user)?;
    let jar = ctx.jar.add(refresh_cookie(
        &rotated.session.raw_token,
        rotated.session.expires_at,
        secure,
    ));

    debug!(user_id = %user.id, "Access token refreshed");

    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            user: PublicUser::from(&user),
        }),
    )
        .into_response())
}

/// POST /auth/logout
///
/// Always succeeds. Revokes the presented session if there is one and clears the cookie.
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    ctx: RequestContext,
) -> (CookieJar, Json<StatusResponse>) {
    if let Some(raw_token) = &ctx.refresh_token {
        if let Err(e) = state.sessions.revoke_session(raw_token).await {
            error!(error = %e, "Failed to revoke refresh session during logout");
        }
    }

    if let Some(identity) = &ctx.identity {
        info!(user_id = %identity.user_id, "User logged out");
    } else {
        debug!("Logout processed");
    }

    let jar = ctx.jar.add(cleared_refresh_cookie(state.config.production));
    (jar, Json(StatusResponse::ok()))
}

/// GET /me
///
/// # Response
/// ```json
/// { "id", "email", "name", "role", "createdAt", "providers": ["github"] }
/// ```
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    AuthedUser(identity): AuthedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(&identity.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %identity.user_id, "Token subject no longer exists");
            ApiError::NotFound("User not found.".to_string())
        })?;

    let providers = state.oauth_accounts.providers_for_user(&user.id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        created_at: user.created_at,
        providers,
    }))
}
