//! Credential and session persistence (SQLite via sqlx)

use sqlx::SqlitePool;

use super::models::{User, DEFAULT_ROLE};
use crate::common::generate_user_id;
use crate::common::helpers::now_rfc3339;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at";

/// True when `e` is a UNIQUE constraint violation
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// ============================================================================
// Credential store
// ============================================================================

#[derive(Clone, Debug)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    /// Lookup by an already-normalized email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.db)
            .await
    }

    /// Insert a new user with the default role
    ///
    /// Fails with a unique violation when the email is already taken.
    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, name, password_hash, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(generate_user_id())
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(DEFAULT_ROLE)
        .bind(now_rfc3339())
        .fetch_one(&self.db)
        .await
    }
}

// ============================================================================
// Session store
// ============================================================================

/// A refresh session row about to be written
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub token_hash: String,
    pub expires_at_ms: i64,
}

/// Refresh session database model
#[cfg(test)]
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RefreshSessionRow {
    pub id: String,
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    db: SqlitePool,
}

impl SessionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        session: &NewSession,
        user_id: &str,
        now_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_sessions (id, token_hash, user_id, expires_at, revoked_at, created_at) \
             VALUES (?, ?, ?, ?, NULL, ?)",
        )
        .bind(&session.id)
        .bind(&session.token_hash)
        .bind(user_id)
        .bind(session.expires_at_ms)
        .bind(now_ms)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Revoke the active session matching `presented_hash` and store `replacement`
    /// for the same user, all in one transaction.
    ///
    /// The conditional UPDATE is the claim: of several concurrent callers presenting
    /// the same hash only one sees a row come back. Returns the owning user id, or
    /// `None` when no unrevoked, unexpired session matched (nothing is written).
    pub async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &NewSession,
        now_ms: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        let mut tx = self.db.begin().await?;

        let claimed: Option<(String,)> = sqlx::query_as(
            "UPDATE refresh_sessions SET revoked_at = ? \
             WHERE token_hash = ? AND revoked_at IS NULL AND expires_at > ? \
             RETURNING user_id",
        )
        .bind(now_ms)
        .bind(presented_hash)
        .bind(now_ms)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id,)) = claimed else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO refresh_sessions (id, token_hash, user_id, expires_at, revoked_at, created_at) \
             VALUES (?, ?, ?, ?, NULL, ?)",
        )
        .bind(&replacement.id)
        .bind(&replacement.token_hash)
        .bind(&user_id)
        .bind(replacement.expires_at_ms)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(user_id))
    }

    /// Mark the session revoked if it is still active. Returns rows affected.
    pub async fn revoke(&self, token_hash: &str, now_ms: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(now_ms)
        .bind(token_hash)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshSessionRow>, sqlx::Error> {
        sqlx::query_as::<_, RefreshSessionRow>(
            "SELECT id, token_hash, user_id, expires_at, revoked_at, created_at \
             FROM refresh_sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await
    }
}
