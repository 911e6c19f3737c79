//! Linked provider accounts (SQLite via sqlx)

use serde::Serialize;
use sqlx::SqlitePool;

use super::provider::ProviderKind;
use crate::common::generate_oauth_account_id;
use crate::common::helpers::now_rfc3339;

/// OAuth account database model
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct OAuthAccount {
    pub id: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

const ACCOUNT_COLUMNS: &str =
    "id, provider, provider_account_id, access_token, user_id, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct OAuthAccountStore {
    db: SqlitePool,
}

impl OAuthAccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        provider: ProviderKind,
        provider_account_id: &str,
    ) -> Result<Option<OAuthAccount>, sqlx::Error> {
        sqlx::query_as::<_, OAuthAccount>(&format!(
            "SELECT {} FROM oauth_accounts WHERE provider = ? AND provider_account_id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(provider.as_str())
        .bind(provider_account_id)
        .fetch_optional(&self.db)
        .await
    }

    /// Insert the link, or refresh token and owner of the existing
    /// `(provider, provider_account_id)` row. Never produces a second row.
    pub async fn upsert(
        &self,
        provider: ProviderKind,
        provider_account_id: &str,
        access_token: &str,
        user_id: &str,
    ) -> Result<OAuthAccount, sqlx::Error> {
        let now = now_rfc3339();
        sqlx::query_as::<_, OAuthAccount>(&format!(
            "INSERT INTO oauth_accounts \
             (id, provider, provider_account_id, access_token, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(provider, provider_account_id) DO UPDATE SET \
               access_token = excluded.access_token, \
               user_id = excluded.user_id, \
               updated_at = excluded.updated_at \
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(generate_oauth_account_id())
        .bind(provider.as_str())
        .bind(provider_account_id)
        .bind(access_token)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await
    }

    /// Provider names linked to `user_id`, alphabetical
    pub async fn providers_for_user(&self, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT provider FROM oauth_accounts WHERE user_id = ? ORDER BY provider",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM oauth_accounts")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
