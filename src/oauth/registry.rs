// src/oauth/registry.rs
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::facebook::FacebookProvider;
use super::github::GithubProvider;
use super::google::GoogleProvider;
use super::provider::{OAuthError, OAuthProvider, ProviderKind};
use crate::common::AppConfig;

/// Adapters for the providers that have credentials configured
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn OAuthProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("configured", &self.configured())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        let mut registry = Self::default();

        for kind in ProviderKind::ALL {
            let Some(creds) = config.provider_credentials(kind).cloned() else {
                continue;
            };
            let adapter: Arc<dyn OAuthProvider> = match kind {
                ProviderKind::Google => Arc::new(GoogleProvider::new(creds, client.clone())),
                ProviderKind::Github => Arc::new(GithubProvider::new(creds, client.clone())),
                ProviderKind::Facebook => Arc::new(FacebookProvider::new(creds, client.clone())),
            };
            registry = registry.register(adapter);
        }

        info!(
            providers = ?registry.configured().iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            "OAuth providers configured"
        );
        registry
    }

    pub fn register(mut self, adapter: Arc<dyn OAuthProvider>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// Adapter for `kind`, or `NotConfigured` when its credentials are absent
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn OAuthProvider>, OAuthError> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or(OAuthError::NotConfigured(kind))
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.adapters.contains_key(k))
            .collect()
    }
}
