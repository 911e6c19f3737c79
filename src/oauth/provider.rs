//! Provider adapter contract shared by Google, GitHub and Facebook.
//!
//! Each adapter turns an authorization code into a provider access token and that
//! token into a normalized [`ProviderProfile`]. Transport, HTTP status and JSON
//! problems are `Err(OAuthError)`; a well-formed answer that lacks an email or an
//! account id is `Ok(ProfileOutcome::Incomplete)`.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error};

use crate::common::config::ProviderCredentials;
use crate::common::{normalize_email, ApiError};

/// User-Agent sent to provider APIs (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("auth_api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Github,
    Facebook,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Google, ProviderKind::Github, ProviderKind::Facebook];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Github => "github",
            ProviderKind::Facebook => "facebook",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(ProviderKind::Google),
            "github" => Ok(ProviderKind::Github),
            "facebook" => Ok(ProviderKind::Facebook),
            other => Err(OAuthError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("OAuth provider {0} is not configured")]
    NotConfigured(ProviderKind),

    #[error("provider denied the authorization: {0}")]
    Denied(String),

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("authorization code exchange failed: {0}")]
    Exchange(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),
}

impl From<OAuthError> for ApiError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::UnknownProvider(_) => {
                ApiError::NotFound("Unknown sign-in provider.".to_string())
            }
            OAuthError::NotConfigured(_) => {
                ApiError::NotImplemented("This sign-in provider is not configured.".to_string())
            }
            OAuthError::StateMismatch => ApiError::BadRequest(
                "The sign-in request expired or was tampered with. Please try again.".to_string(),
            ),
            OAuthError::Denied(_) => {
                ApiError::UpstreamProvider("The provider did not authorize the sign-in.".to_string())
            }
            OAuthError::Exchange(_) | OAuthError::ProfileFetch(_) => ApiError::UpstreamProvider(
                "Could not complete sign-in with the provider. Please try again.".to_string(),
            ),
        }
    }
}

/// Normalized identity reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingProfileField {
    Email,
    AccountId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    Complete(ProviderProfile),
    Incomplete(MissingProfileField),
}

impl ProfileOutcome {
    /// Build an outcome from raw provider fields; blank values count as missing
    pub fn from_parts(
        provider_account_id: Option<String>,
        email: Option<String>,
        name: Option<String>,
    ) -> Self {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let Some(provider_account_id) = non_blank(provider_account_id) else {
            return ProfileOutcome::Incomplete(MissingProfileField::AccountId);
        };
        let Some(email) = non_blank(email) else {
            return ProfileOutcome::Incomplete(MissingProfileField::Email);
        };

        ProfileOutcome::Complete(ProviderProfile {
            provider_account_id,
            email: normalize_email(&email),
            name: non_blank(name),
        })
    }
}

/// Authorization, token and API base URLs for one provider
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// URL the browser is sent to in order to start the authorization
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String;

    /// Trade an authorization code for a provider access token
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError>;

    /// Fetch and normalize the signed-in account's profile
    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileOutcome, OAuthError>;
}

/// Standard authorization URL with the code response type
pub fn build_authorize_url(
    endpoints: &ProviderEndpoints,
    credentials: &ProviderCredentials,
    scope: &str,
    state: &str,
    redirect_uri: &str,
) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        endpoints.authorize_url,
        urlencoding::encode(&credentials.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scope),
        urlencoding::encode(state),
    )
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Authorization-code grant against `endpoints.token_url`
///
/// GitHub answers errors with HTTP 200 and an `error` field, so both the status
/// and the body are checked.
pub async fn exchange_authorization_code(
    http: &Client,
    kind: ProviderKind,
    endpoints: &ProviderEndpoints,
    credentials: &ProviderCredentials,
    code: &str,
    redirect_uri: &str,
) -> Result<String, OAuthError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
    ];

    debug!(provider = %kind, "Exchanging authorization code for access token");

    let response = http
        .post(&endpoints.token_url)
        .header(ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| OAuthError::Exchange(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(provider = %kind, status = %status, error = %error_text, "Token exchange failed");
        return Err(OAuthError::Exchange(format!("HTTP {}", status)));
    }

    let body = response
        .json::<TokenEndpointResponse>()
        .await
        .map_err(|e| OAuthError::Exchange(e.to_string()))?;

    match (body.access_token, body.error) {
        (Some(token), None) if !token.is_empty() => Ok(token),
        (_, error) => {
            let reason = error.unwrap_or_else(|| "missing access_token".to_string());
            error!(
                provider = %kind,
                error = %reason,
                description = ?body.error_description,
                "Token endpoint returned no access token"
            );
            Err(OAuthError::Exchange(reason))
        }
    }
}

/// GET a provider API resource with a bearer token and decode it as JSON
pub async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    kind: ProviderKind,
    resource: &str,
) -> Result<T, OAuthError> {
    let response = request
        .send()
        .await
        .map_err(|e| OAuthError::ProfileFetch(format!("{}: {}", resource, e)))?;

    let status = response.status();
    if !status.is_success() {
        error!(provider = %kind, resource = %resource, status = %status, "Profile request failed");
        return Err(OAuthError::ProfileFetch(format!("{}: HTTP {}", resource, status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| OAuthError::ProfileFetch(format!("{}: {}", resource, e)))
}
