//! Cookie builders for the refresh session and the OAuth state.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::{Duration, OffsetDateTime};

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const OAUTH_STATE_COOKIE_NAME: &str = "oauthState";

const OAUTH_STATE_PATH: &str = "/auth/oauth";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// HttpOnly, SameSite=Lax refresh cookie expiring with the session
pub fn refresh_cookie(raw_token: &str, expires_at: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((REFRESH_COOKIE_NAME, raw_token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
        cookie.set_expires(expires);
    }
    cookie
}

/// Already-expired refresh cookie; always emits a Set-Cookie header
pub fn cleared_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Short-lived cookie carrying the OAuth `state` value (signed by the jar)
pub fn oauth_state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(OAUTH_STATE_PATH)
        .max_age(Duration::minutes(OAUTH_STATE_TTL_MINUTES))
        .build()
}

pub fn cleared_oauth_state_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(OAUTH_STATE_PATH)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
