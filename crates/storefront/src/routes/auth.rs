//! Identity bridge route handlers.
//!
//! Reconciles the identity provider's session with the catalog's user
//! record. The one hard rule: a catalog user with `blocked: true` never
//! keeps a session - local state is cleared, the provider session is
//! revoked, and the client is told to land on the blocked page, not the
//! default landing page.

use axum::{Json, extract::State, http::StatusCode};
use paperstack_core::Email;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::session::keys;
use crate::models::user::SessionProfile;
use crate::state::AppState;

/// Session-establishment request: the provider session token the browser
/// obtained by signing in.
#[derive(Debug, serde::Deserialize)]
pub struct EstablishRequest {
    pub token: String,
}

/// Read the current profile out of the session, or reject.
pub(crate) async fn require_profile(session: &Session) -> Result<SessionProfile> {
    session
        .get::<SessionProfile>(keys::PROFILE)
        .await?
        .ok_or_else(|| AppError::Unauthorized("no active session".to_string()))
}

/// Tear down both sides of a blocked user's session.
async fn eject_blocked(state: &AppState, session: &Session, identity_session: &str) -> AppError {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to clear session for blocked user");
    }
    if let Err(e) = state.identity().revoke_session(identity_session).await {
        tracing::error!(error = %e, "Failed to revoke provider session for blocked user");
    }
    tracing::warn!("Blocked user ejected");
    AppError::Blocked
}

/// Establish a session from a provider token.
///
/// Verifies the token, syncs the catalog user record, and stores the
/// profile in the session. A user the catalog has never seen gets an
/// empty library and unblocked status. This is initial route data
/// loading: a catalog failure here propagates instead of being
/// swallowed.
#[instrument(skip(state, session, request))]
pub async fn establish(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<EstablishRequest>,
) -> Result<Json<SessionProfile>> {
    let claims = state.identity().verify_session(&request.token).await?;
    let email = Email::parse(&claims.email)
        .map_err(|e| AppError::BadRequest(format!("identity email: {e}")))?;

    let profile = match state.catalog().find_user_by_email(email.as_str()).await? {
        Some(user) if user.blocked => {
            return Err(eject_blocked(&state, &session, &claims.session_id).await);
        }
        Some(user) => SessionProfile {
            email,
            identity_id: claims.user_id,
            blocked: false,
            purchased: user.purchased_file_ids(),
        },
        None => SessionProfile::first_time(email, claims.user_id),
    };

    session.insert(keys::PROFILE, &profile).await?;
    session
        .insert(keys::IDENTITY_SESSION, &claims.session_id)
        .await?;

    Ok(Json(profile))
}

/// Current profile, re-synced against the catalog.
///
/// A failed re-sync is logged and the prior profile served unchanged
/// (stale-but-available). A blocked flag discovered here still ejects.
#[instrument(skip(state, session))]
pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SessionProfile>> {
    let profile = require_profile(&session).await?;

    match state.catalog().find_user_by_email(profile.email.as_str()).await {
        Ok(Some(user)) if user.blocked => {
            let identity_session = session
                .get::<String>(keys::IDENTITY_SESSION)
                .await?
                .unwrap_or_default();
            Err(eject_blocked(&state, &session, &identity_session).await)
        }
        Ok(Some(user)) => {
            let refreshed = SessionProfile {
                purchased: user.purchased_file_ids(),
                ..profile
            };
            session.insert(keys::PROFILE, &refreshed).await?;
            Ok(Json(refreshed))
        }
        Ok(None) => Ok(Json(profile)),
        Err(e) => {
            tracing::warn!(error = %e, "Profile re-sync failed, serving stale profile");
            Ok(Json(profile))
        }
    }
}

/// End the session: revoke the provider session and clear local state.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Some(identity_session) = session.get::<String>(keys::IDENTITY_SESSION).await? {
        if let Err(e) = state.identity().revoke_session(&identity_session).await {
            tracing::warn!(error = %e, "Provider session revocation failed on logout");
        }
    }

    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}
