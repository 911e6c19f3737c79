// src/oauth/github.rs
//! GitHub adapter.
//!
//! `/user` does not reliably carry an email (it is null for private emails), so the
//! address always comes from `/user/emails`: the entry that is both primary and
//! verified. No such entry means the profile is incomplete.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{
    build_authorize_url, exchange_authorization_code, get_json, MissingProfileField, OAuthError,
    OAuthProvider, ProfileOutcome, ProviderEndpoints, ProviderKind, USER_AGENT,
};
use crate::common::config::ProviderCredentials;

const SCOPE: &str = "read:user user:email";
const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: Option<i64>,
    login: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug, Clone)]
pub struct GithubProvider {
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    client: Client,
}

impl GithubProvider {
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
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }

    fn api_get(&self, path: &str, access_token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.endpoints.api_base, path))
            .bearer_auth(access_token)
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT_HEADER, USER_AGENT)
    }
}

fn primary_verified_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

#[async_trait]
impl OAuthProvider for GithubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
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
        let user: GithubUser = get_json(self.api_get("/user", access_token), self.kind(), "user").await?;

        let Some(id) = user.id else {
            return Ok(ProfileOutcome::Incomplete(MissingProfileField::AccountId));
        };

        let emails: Vec<GithubEmail> =
            get_json(self.api_get("/user/emails", access_token), self.kind(), "user/emails").await?;
        debug!(github_id = id, email_count = emails.len(), "Fetched GitHub emails");

        let email = primary_verified_email(emails);
        if email.is_none() {
            warn!(github_id = id, "GitHub account has no primary verified email");
        }

        Ok(ProfileOutcome::from_parts(
            Some(id.to_string()),
            email,
            user.name.or(user.login),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(address: &str, primary: bool, verified: bool) -> GithubEmail {
        GithubEmail {
            email: address.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn test_primary_verified_email_selection() {
        let emails = vec![
            email("old@example.com", false, true),
            email("main@example.com", true, true),
        ];
        assert_eq!(primary_verified_email(emails), Some("main@example.com".to_string()));
    }

    #[test]
    fn test_unverified_primary_is_ignored() {
        let emails = vec![
            email("main@example.com", true, false),
            email("other@example.com", false, true),
        ];
        assert_eq!(primary_verified_email(emails), None);
        assert_eq!(primary_verified_email(Vec::new()), None);
    }
}
