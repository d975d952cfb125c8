//! Order history route handler.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::catalog::types::Order;
use crate::error::Result;
use crate::state::AppState;

/// The session user's orders, newest first.
///
/// Served from the per-email cache: refreshed at most hourly, with the
/// previous list retained when a refresh fails.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Json<Vec<Order>>> {
    let profile = super::auth::require_profile(&session).await?;

    let orders = state
        .orders()
        .for_email(state.catalog(), profile.email.as_str())
        .await?;

    Ok(Json(orders.as_ref().clone()))
}
