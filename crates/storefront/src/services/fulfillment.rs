//! Payment confirmation and digital delivery.
//!
//! The business half of the payment webhook. Order lifecycle here is a
//! single transition: `pending` → `completed` when the provider reports
//! the invoice PAID. Everything downstream of that transition (purchased
//! set merge, per-file grants, delivery email) is best-effort: each
//! failure is logged and the rest of the sequence continues.

use std::collections::BTreeSet;

use paperstack_core::{Email, OrderReference, ProductId};
use tracing::instrument;

use crate::error::AppError;
use crate::services::drive::viewer_link;
use crate::services::email::DeliveryLink;
use crate::services::xendit::{DeliveryItem, InvoiceCallback};
use crate::state::AppState;

/// What the handler did with a callback, for the response body and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Status was not PAID; nothing to do.
    Ignored,
    /// This provider event id was already fulfilled; side effects skipped.
    Duplicate,
    /// No order matches the correlation reference; nothing was mutated
    /// and no fulfillment ran.
    OrderMissing,
    /// Order completed and delivery attempted.
    Fulfilled {
        /// Items whose permission grant succeeded.
        granted: usize,
        /// Items in the delivery manifest.
        items: usize,
    },
}

impl FulfillmentOutcome {
    /// Short status word for the webhook response body.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Duplicate => "duplicate",
            Self::OrderMissing | Self::Fulfilled { .. } => "success",
        }
    }
}

/// Process a verified invoice callback.
///
/// The authenticity check lives in the route layer and MUST have passed
/// before this runs; everything here assumes a trusted payload.
///
/// # Errors
///
/// Returns an error only when the order-completion update itself fails -
/// the provider will redeliver, and the event is not yet marked
/// processed, so the retry gets a full second attempt.
#[instrument(skip(state, callback), fields(event = %callback.id, reference = %callback.external_id))]
pub async fn confirm_payment(
    state: &AppState,
    callback: InvoiceCallback,
) -> Result<FulfillmentOutcome, AppError> {
    if !callback.is_paid() {
        return Ok(FulfillmentOutcome::Ignored);
    }

    if state.event_already_processed(&callback.id) {
        tracing::info!("Replayed PAID event, skipping side effects");
        return Ok(FulfillmentOutcome::Duplicate);
    }

    let reference = OrderReference::new(callback.external_id.clone());
    let Some(order) = state.catalog().find_order_by_reference(&reference).await? else {
        tracing::warn!("PAID event matches no order; skipping fulfillment");
        return Ok(FulfillmentOutcome::OrderMissing);
    };

    // Record settlement: the provider payment id replaces the correlation
    // reference on the order record.
    state
        .catalog()
        .update_order(
            &order,
            serde_json::json!({
                "transactionId": callback.id,
                "orderStatus": "completed",
                "paidAt": callback.paid_at,
                "paymentMethod": callback.channel(),
            }),
        )
        .await?;

    let manifest = callback.metadata.map(|m| m.delivery).unwrap_or_default();
    let items = manifest.len();

    let Some(payer_email) = callback.payer_email.as_deref() else {
        tracing::warn!("PAID event has no payer email; delivery skipped");
        state.mark_event_processed(&callback.id);
        return Ok(FulfillmentOutcome::Fulfilled { granted: 0, items });
    };

    if manifest.is_empty() {
        tracing::warn!("PAID event has no delivery manifest; delivery skipped");
        state.mark_event_processed(&callback.id);
        return Ok(FulfillmentOutcome::Fulfilled { granted: 0, items });
    }

    merge_purchases(state, payer_email, &manifest).await;
    let (links, granted) = grant_access(state, payer_email, &manifest).await;

    // One email for the whole order, sent even when individual grants
    // failed - the raw link still works for users with existing access
    if let Ok(to) = Email::parse(payer_email) {
        if let Err(e) = state
            .mailer()
            .send_delivery_email(&to, reference.as_str(), &links)
            .await
        {
            tracing::error!(error = %e, "Delivery email failed");
        }
    } else {
        tracing::warn!("Payer email unparseable; delivery email skipped");
    }

    state.orders().invalidate(payer_email).await;
    state.mark_event_processed(&callback.id);

    Ok(FulfillmentOutcome::Fulfilled { granted, items })
}

/// Merge the manifest's product ids into the buyer's purchased set.
///
/// Set union, never concatenation: redelivered events and repeat
/// purchases must not accumulate duplicates.
async fn merge_purchases(state: &AppState, payer_email: &str, manifest: &[DeliveryItem]) {
    match state.catalog().find_user_by_email(payer_email).await {
        Ok(Some(user)) => {
            let mut ids: BTreeSet<ProductId> = user.purchased_product_ids().into_iter().collect();
            ids.extend(manifest.iter().map(|item| item.product_id));
            let ids: Vec<ProductId> = ids.into_iter().collect();

            if let Err(e) = state.catalog().set_user_purchased(user.id, &ids).await {
                tracing::error!(error = %e, "Failed to update purchased set");
            }
        }
        Ok(None) => {
            tracing::warn!("No catalog user for payer email; purchased set not updated");
        }
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed; purchased set not updated");
        }
    }
}

/// Grant read access per item. Each grant is independent; a failure is
/// logged and the viewer link is included regardless.
async fn grant_access(
    state: &AppState,
    payer_email: &str,
    manifest: &[DeliveryItem],
) -> (Vec<DeliveryLink>, usize) {
    let mut links = Vec::with_capacity(manifest.len());
    let mut granted = 0usize;

    for item in manifest {
        match state.storage().grant_reader(&item.file_id, payer_email).await {
            Ok(()) => {
                granted += 1;
                tracing::info!(file = %item.file_id, "Permission granted");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file = %item.file_id,
                    "Permission grant failed; including link anyway"
                );
            }
        }

        links.push(DeliveryLink {
            name: item.name.clone(),
            link: viewer_link(&item.file_id),
        });
    }

    (links, granted)
}
