//! Checkout route handlers.
//!
//! `create` runs the placement sequence and hands back the hosted
//! invoice URL for redirect. `confirm` is the post-payment poll: the
//! cart is cleared only here, once fulfillment has actually been
//! observed - never optimistically on the redirect.

use std::collections::BTreeSet;

use axum::{Json, extract::State};
use paperstack_core::{Email, FileId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::session::keys;
use crate::models::user::SessionProfile;
use crate::services::checkout::{CheckoutRequest, place_order};
use crate::services::confirm::{PollPolicy, await_purchases};
use crate::state::AppState;

use super::cart::{load_cart, save_cart};
use super::catalog::current_currency;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    /// Where the delivery email goes; prefilled client-side from the
    /// profile but freely editable.
    pub email: String,
    /// Optional override of the session's selected currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Checkout response: where to send the browser.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub invoice_url: String,
    pub reference: String,
}

/// Place an order for the session cart.
///
/// Validation (non-empty cart, parseable email) happens before any
/// network call.
#[instrument(skip(state, session, form))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<CheckoutResponse>> {
    let email =
        Email::parse(&form.email).map_err(|e| AppError::BadRequest(format!("delivery email: {e}")))?;

    let cart = load_cart(&session).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let currency = match form.currency {
        Some(code) => {
            let configs = state.catalog().currency_settings().await?;
            configs
                .into_iter()
                .find(|config| config.code == code)
                .ok_or_else(|| AppError::BadRequest(format!("unknown currency: {code}")))?
        }
        None => current_currency(&state, &session).await?,
    };

    let identity_id = session
        .get::<SessionProfile>(keys::PROFILE)
        .await?
        .map(|profile| profile.identity_id);

    let placed = place_order(
        &state,
        CheckoutRequest {
            email,
            identity_id,
            currency,
            lines: cart.into_lines(),
        },
    )
    .await?;

    // The cart survives the redirect; only a confirmed fulfillment
    // (see `confirm`) clears it.
    Ok(Json(CheckoutResponse {
        invoice_url: placed.invoice_url,
        reference: placed.reference.to_string(),
    }))
}

/// Confirmation poll response.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub confirmed: bool,
    pub attempts: u32,
    pub purchased: BTreeSet<FileId>,
}

/// Watch for fulfillment after the payment redirect.
///
/// Polls the catalog with a fixed attempt budget and exponential
/// backoff. On observed fulfillment: the session profile picks up the
/// new purchases, the order-history cache is invalidated, and the cart
/// is cleared. Budget exhaustion leaves everything intact and reports
/// `confirmed: false`.
#[instrument(skip(state, session))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ConfirmResponse>> {
    let profile = super::auth::require_profile(&session).await?;
    let initial_count = profile.purchased_count();

    let outcome = await_purchases(
        state.catalog(),
        profile.email.as_str(),
        initial_count,
        PollPolicy::default(),
    )
    .await;

    if outcome.confirmed {
        let refreshed = SessionProfile {
            purchased: outcome.purchased.clone(),
            ..profile
        };
        state.orders().invalidate(refreshed.email.as_str()).await;
        session.insert(keys::PROFILE, &refreshed).await?;

        let mut cart = load_cart(&session).await?;
        cart.clear();
        save_cart(&session, &cart).await?;
    }

    Ok(Json(ConfirmResponse {
        confirmed: outcome.confirmed,
        attempts: outcome.attempts,
        purchased: outcome.purchased,
    }))
}
