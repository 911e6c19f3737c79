// src/oauth/google.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::provider::{
    build_authorize_url, exchange_authorization_code, get_json, OAuthError, OAuthProvider,
    ProfileOutcome, ProviderEndpoints, ProviderKind, USER_AGENT,
};
use crate::common::config::ProviderCredentials;

const SCOPE: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    client: Client,
}

impl GoogleProvider {
    pub fn new(credentials: ProviderCredentials, client: Client) -> Self {
        Self::with_endpoints(credentials, client, Self::default_endpoints())
    }

    pub fn with_endpoints(
        credentials: ProviderCredentials,
        client: Client,
        endpoints: ProviderEndpoints,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            client,
        }
    }

    pub fn default_endpoints() -> ProviderEndpoints {
        ProviderEndpoints {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        build_authorize_url(&self.endpoints, &self.credentials, SCOPE, state, redirect_uri)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        exchange_authorization_code(
            &self.client,
            self.kind(),
            &self.endpoints,
            &self.credentials,
            code,
            redirect_uri,
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileOutcome, OAuthError> {
        let request = self
            .client
            .get(format!("{}/oauth2/v2/userinfo", self.endpoints.api_base))
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        let info: GoogleUserInfo = get_json(request, self.kind(), "userinfo").await?;
        debug!(has_email = info.email.is_some(), "Fetched Google user info");

        Ok(ProfileOutcome::from_parts(info.id, info.email, info.name))
    }
}
