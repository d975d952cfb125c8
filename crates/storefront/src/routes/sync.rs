//! Catalog sync route handlers.
//!
//! Thin guards over [`crate::services::sync`]. The `x-sync-secret`
//! header is enforced only when a secret is configured; deployments
//! without one leave the endpoints open (they are idempotent and create
//! drafts only).

use axum::{Json, extract::State, http::HeaderMap};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::sync::{EntryOutcome, SubCategorySummary};
use crate::state::AppState;

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    if let Some(secret) = &state.config().sync_secret {
        let provided = headers
            .get("x-sync-secret")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if provided.is_empty() || provided != secret.expose_secret() {
            return Err(AppError::Unauthorized("invalid sync secret".to_string()));
        }
    }

    Ok(())
}

/// Mirror root-level storage folders into categories.
#[instrument(skip(state, headers))]
pub async fn categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EntryOutcome>>> {
    authorize(&state, &headers)?;
    Ok(Json(crate::services::sync::sync_categories(&state).await?))
}

/// Mirror second-level storage folders into sub-categories.
#[instrument(skip(state, headers))]
pub async fn sub_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EntryOutcome>>> {
    authorize(&state, &headers)?;
    Ok(Json(
        crate::services::sync::sync_sub_categories(&state).await?,
    ))
}

/// Mirror storage files into draft products.
#[instrument(skip(state, headers))]
pub async fn products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SubCategorySummary>>> {
    authorize(&state, &headers)?;
    Ok(Json(crate::services::sync::sync_products(&state).await?))
}
