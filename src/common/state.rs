// Application state shared across all modules

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::sessions::SessionManager;
use crate::auth::store::{SessionStore, UserStore};
use crate::auth::tokens::TokenService;
use crate::oauth::registry::ProviderRegistry;
use crate::oauth::store::OAuthAccountStore;

/// Process-wide state built once at startup and shared read-only by every request
#[derive(Clone)]
pub struct AppState {
    #[cfg(test)]
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub sessions: SessionManager,
    pub users: UserStore,
    pub oauth_accounts: OAuthAccountStore,
    pub providers: ProviderRegistry,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig, providers: ProviderRegistry) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.access_token_ttl());
        let sessions = SessionManager::new(SessionStore::new(db.clone()), config.refresh_token_ttl());
        let cookie_key = derive_cookie_key(&config.cookie_secret);

        Self {
            users: UserStore::new(db.clone()),
            oauth_accounts: OAuthAccountStore::new(db.clone()),
            #[cfg(test)]
            db,
            config: Arc::new(config),
            tokens,
            sessions,
            providers,
            cookie_key,
        }
    }
}

/// Signing key for cookies, stretched from the configured secret to the 64 bytes `Key` needs
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
