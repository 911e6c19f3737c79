//! Access and refresh token primitives
//!
//! - Access tokens are HS256 JWTs carrying `sub`, `email` and `role`, valid for a
//!   configurable number of minutes. Verification never errors: anything that does
//!   not check out is simply "no identity".
//! - Refresh tokens are 32 random bytes from the OS CSPRNG, hex encoded. Only their
//!   SHA-256 digest is ever persisted.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::models::{Claims, Identity, User};
use crate::common::ApiError;

/// Raw refresh token size in bytes (64 hex characters)
pub const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign access token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::InternalServer(e.to_string())
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    access_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            access_ttl,
        }
    }

    /// Sign an access token for `user`, valid from now
    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        self.issue_access_token_at(user, Utc::now())
    }

    /// Sign an access token as if issued at `issued_at`
    pub fn issue_access_token_at(
        &self,
        user: &User,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let exp = issued_at + self.access_ttl;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: exp.timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate signature and expiry, returning the embedded identity
    pub fn verify_access_token(&self, token: &str) -> Option<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(Identity {
                user_id: data.claims.sub,
                email: data.claims.email,
                role: data.claims.role,
            }),
            Err(e) => {
                debug!(error = %e, "Access token rejected");
                None
            }
        }
    }

    /// Resolve an `Authorization` header value of the exact form `Bearer <token>`
    pub fn parse_bearer_authorization(&self, header_value: &str) -> Option<Identity> {
        let token = header_value.strip_prefix("Bearer ")?;
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        self.verify_access_token(token)
    }
}

/// Generate a fresh opaque refresh token
pub fn mint_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest used to store and look up refresh sessions
pub fn hash_refresh_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
