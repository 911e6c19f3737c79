//! Sign-in completion: provider profile → local user, link, session.

use tracing::{info, warn};

use super::provider::{OAuthProvider, ProfileOutcome, ProviderProfile};
use crate::auth::models::User;
use crate::auth::sessions::IssuedSession;
use crate::auth::store::is_unique_violation;
use crate::common::{safe_email_log, ApiError, AppState};

/// How the local user for a provider sign-in was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The provider account was already linked
    ExistingLink,
    /// A user with the provider's email already existed
    MatchedEmail,
    /// A new passwordless user was created
    Created,
}

/// Pick the local user for `profile`: linked account first, then email, then a new user
pub async fn resolve_user(
    state: &AppState,
    adapter: &dyn OAuthProvider,
    profile: &ProviderProfile,
) -> Result<(User, Resolution), ApiError> {
    if let Some(account) = state
        .oauth_accounts
        .find(adapter.kind(), &profile.provider_account_id)
        .await?
    {
        if let Some(user) = state.users.find_by_id(&account.user_id).await? {
            return Ok((user, Resolution::ExistingLink));
        }
    }

    if let Some(user) = state.users.find_by_email(&profile.email).await? {
        return Ok((user, Resolution::MatchedEmail));
    }

    match state
        .users
        .create(&profile.email, profile.name.as_deref(), None)
        .await
    {
        Ok(user) => Ok((user, Resolution::Created)),
        // Lost a race with a concurrent sign-up for the same email
        Err(e) if is_unique_violation(&e) => state
            .users
            .find_by_email(&profile.email)
            .await?
            .map(|user| (user, Resolution::MatchedEmail))
            .ok_or_else(|| ApiError::InternalServer("user vanished after email conflict".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Run the code exchange, profile fetch and account linking for one callback
///
/// Nothing is persisted unless the provider returned a complete profile.
pub async fn complete_sign_in(
    state: &AppState,
    adapter: &dyn OAuthProvider,
    code: &str,
) -> Result<(User, IssuedSession), ApiError> {
    let kind = adapter.kind();
    let redirect_uri = state.config.oauth_callback_url(kind);

    let provider_token = adapter.exchange_code(code, &redirect_uri).await?;

    let profile = match adapter.fetch_profile(&provider_token).await? {
        ProfileOutcome::Complete(profile) => profile,
        ProfileOutcome::Incomplete(missing) => {
            warn!(provider = %kind, missing = ?missing, "Provider profile incomplete, aborting sign-in");
            return Err(ApiError::UpstreamProvider(
                "The provider did not supply the required profile data.".to_string(),
            ));
        }
    };

    let (user, resolution) = resolve_user(state, adapter, &profile).await?;

    state
        .oauth_accounts
        .upsert(kind, &profile.provider_account_id, &provider_token, &user.id)
        .await?;

    let session = state.sessions.issue_session(&user.id).await?;

    info!(
        provider = %kind,
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        resolution = ?resolution,
        "OAuth sign-in completed"
    );

    Ok((user, session))
}
