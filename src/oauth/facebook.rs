// src/oauth/facebook.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::provider::{
    build_authorize_url, exchange_authorization_code, get_json, OAuthError, OAuthProvider,
    ProfileOutcome, ProviderEndpoints, ProviderKind, USER_AGENT,
};
use crate::common::config::ProviderCredentials;

const SCOPE: &str = "email public_profile";
const GRAPH_VERSION: &str = "v18.0";

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FacebookProvider {
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    client: Client,
}

impl FacebookProvider {
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
            authorize_url: format!("https://www.facebook.com/{}/dialog/oauth", GRAPH_VERSION),
            token_url: format!("https://graph.facebook.com/{}/oauth/access_token", GRAPH_VERSION),
            api_base: format!("https://graph.facebook.com/{}", GRAPH_VERSION),
        }
    }
}

#[async_trait]
impl OAuthProvider for FacebookProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Facebook
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
        // Graph only returns the fields asked for; email is absent for phone-only accounts
        let request = self
            .client
            .get(format!("{}/me", self.endpoints.api_base))
            .query(&[("fields", "id,name,email")])
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        let user: FacebookUser = get_json(request, self.kind(), "me").await?;
        debug!(has_email = user.email.is_some(), "Fetched Facebook profile");

        Ok(ProfileOutcome::from_parts(user.id, user.email, user.name))
    }
}
