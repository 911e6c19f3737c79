//! Refresh session lifecycle: issue, rotate, revoke.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::{NewSession, SessionStore};
use super::tokens::{hash_refresh_token, mint_refresh_token};
use crate::common::{generate_session_id, safe_token_log, ApiError};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown, revoked or expired refresh token
    #[error("refresh session is invalid")]
    Invalid,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Invalid => ApiError::Unauthorized("Your session has expired.".to_string()),
            SessionError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

/// A freshly stored session; `raw_token` goes to the cookie and nowhere else
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful rotation
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub user_id: String,
    pub session: IssuedSession,
}

#[derive(Clone, Debug)]
pub struct SessionManager {
    store: SessionStore,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: SessionStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn prepare(&self, now: DateTime<Utc>) -> (String, NewSession, DateTime<Utc>) {
        let raw_token = mint_refresh_token();
        let expires_at = now + self.ttl;
        let new_session = NewSession {
            id: generate_session_id(),
            token_hash: hash_refresh_token(&raw_token),
            expires_at_ms: expires_at.timestamp_millis(),
        };
        (raw_token, new_session, expires_at)
    }

    /// Mint and persist a new refresh session for `user_id`
    pub async fn issue_session(&self, user_id: &str) -> Result<IssuedSession, SessionError> {
        let now = Utc::now();
        let (raw_token, new_session, expires_at) = self.prepare(now);

        self.store
            .insert(&new_session, user_id, now.timestamp_millis())
            .await?;

        info!(
            user_id = %user_id,
            session_id = %new_session.id,
            expires_at = %expires_at,
            "Refresh session issued"
        );

        Ok(IssuedSession {
            raw_token,
            expires_at,
        })
    }

    /// Exchange a valid refresh token for a new one, revoking the old session
    pub async fn rotate_session(&self, raw_token: &str) -> Result<RotatedSession, SessionError> {
        let now = Utc::now();
        let presented_hash = hash_refresh_token(raw_token);
        let (new_raw_token, new_session, expires_at) = self.prepare(now);

        match self
            .store
            .rotate(&presented_hash, &new_session, now.timestamp_millis())
            .await?
        {
            Some(user_id) => {
                info!(
                    user_id = %user_id,
                    session_id = %new_session.id,
                    "Refresh session rotated"
                );
                Ok(RotatedSession {
                    user_id,
                    session: IssuedSession {
                        raw_token: new_raw_token,
                        expires_at,
                    },
                })
            }
            None => {
                warn!(
                    token = %safe_token_log(raw_token),
                    "Refresh rejected: session unknown, revoked or expired"
                );
                Err(SessionError::Invalid)
            }
        }
    }

    /// Revoke the session for `raw_token` if it is still active; no-op otherwise
    pub async fn revoke_session(&self, raw_token: &str) -> Result<(), SessionError> {
        let revoked = self
            .store
            .revoke(&hash_refresh_token(raw_token), Utc::now().timestamp_millis())
            .await?;

        debug!(revoked = revoked, "Refresh session revocation processed");
        Ok(())
    }
}
