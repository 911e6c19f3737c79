// src/common/config.rs
//! Process configuration loaded once from the environment at startup.

use chrono::Duration;
use std::env;
use thiserror::Error;
use tracing::warn;

use crate::oauth::provider::ProviderKind;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";
const DEV_COOKIE_SECRET: &str = "dev-cookie-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when APP_ENV=production")]
    MissingSecret(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Client credentials for one OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub api_base_url: String,
    pub web_base_url: String,
    pub jwt_secret: String,
    pub cookie_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub google: Option<ProviderCredentials>,
    pub github: Option<ProviderCredentials>,
    pub facebook: Option<ProviderCredentials>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://auth_api.db".to_string(),
            api_base_url: "http://localhost:4000".to_string(),
            web_base_url: "http://localhost:3000".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            cookie_secret: DEV_COOKIE_SECRET.to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 14,
            host: "0.0.0.0".to_string(),
            port: 4000,
            production: false,
            google: None,
            github: None,
            facebook: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(url) = env::var("API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = env::var("WEB_BASE_URL") {
            config.web_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(host) = env::var("API_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16>("API_PORT")? {
            config.port = port;
        }

        config.jwt_secret = secret_var("JWT_SECRET", DEV_JWT_SECRET, config.production)?;
        config.cookie_secret = secret_var("COOKIE_SECRET", DEV_COOKIE_SECRET, config.production)?;

        if let Some(minutes) = parse_var::<i64>("ACCESS_TOKEN_TTL_MINUTES")? {
            if minutes <= 0 {
                return Err(ConfigError::InvalidValue {
                    key: "ACCESS_TOKEN_TTL_MINUTES",
                    value: minutes.to_string(),
                });
            }
            config.access_token_ttl_minutes = minutes;
        }
        if let Some(days) = parse_var::<i64>("REFRESH_TOKEN_TTL_DAYS")? {
            if days <= 0 {
                return Err(ConfigError::InvalidValue {
                    key: "REFRESH_TOKEN_TTL_DAYS",
                    value: days.to_string(),
                });
            }
            config.refresh_token_ttl_days = days;
        }

        config.google = provider_credentials("GOOGLE");
        config.github = provider_credentials("GITHUB");
        config.facebook = provider_credentials("FACEBOOK");

        Ok(config)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn provider_credentials(&self, kind: ProviderKind) -> Option<&ProviderCredentials> {
        match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Github => self.github.as_ref(),
            ProviderKind::Facebook => self.facebook.as_ref(),
        }
    }

    /// Callback URL registered with the provider for `kind`
    pub fn oauth_callback_url(&self, kind: ProviderKind) -> String {
        format!("{}/auth/oauth/{}/callback", self.api_base_url, kind.as_str())
    }

    /// Client-side page the browser lands on after an OAuth sign-in
    pub fn oauth_completion_url(&self) -> String {
        format!("{}/auth/complete", self.web_base_url)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

fn secret_var(
    key: &'static str,
    dev_default: &str,
    production: bool,
) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if production => Err(ConfigError::MissingSecret(key)),
        _ => {
            warn!(key = key, "Secret not set, using development default");
            Ok(dev_default.to_string())
        }
    }
}

fn provider_credentials(prefix: &str) -> Option<ProviderCredentials> {
    let client_id = env::var(format!("{}_CLIENT_ID", prefix)).ok()?;
    let client_secret = env::var(format!("{}_CLIENT_SECRET", prefix)).ok()?;
    if client_id.trim().is_empty() || client_secret.trim().is_empty() {
        warn!(provider = %prefix.to_lowercase(), "OAuth credentials are empty, provider disabled");
        return None;
    }
    Some(ProviderCredentials {
        client_id,
        client_secret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = AppConfig::default();
        assert_eq!(config.access_token_ttl(), Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl(), Duration::days(14));
        assert!(!config.production);
    }

    #[test]
    fn test_oauth_urls() {
        let config = AppConfig::default();
        assert_eq!(
            config.oauth_callback_url(ProviderKind::Github),
            "http://localhost:4000/auth/oauth/github/callback"
        );
        assert_eq!(config.oauth_completion_url(), "http://localhost:3000/auth/complete");
    }

    #[test]
    fn test_provider_credentials_lookup() {
        let config = AppConfig {
            facebook: Some(ProviderCredentials {
                client_id: "fb-id".to_string(),
                client_secret: "fb-secret".to_string(),
            }),
            ..AppConfig::default()
        };
        assert!(config.provider_credentials(ProviderKind::Facebook).is_some());
        assert!(config.provider_credentials(ProviderKind::Google).is_none());
    }
}
