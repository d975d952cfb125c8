//! Order placement sequencer.
//!
//! Turns a cart into a pending catalog order, its order items, and a
//! hosted payment invoice, in that sequence - each step's output feeds
//! the next. Item creation fans out concurrently once the parent order
//! exists. If any step fails after the order record committed, the order
//! is compensated to `cancelled` before the error surfaces; the caller
//! always sees a single error with no partial-success detail.

use chrono::Utc;
use futures::future::join_all;
use paperstack_core::{CurrencyConfig, Email, OrderReference};
use rust_decimal::Decimal;
use tracing::instrument;

use crate::catalog::types::Order;
use crate::error::AppError;
use crate::models::cart::CartLine;
use crate::services::xendit::{CreateInvoice, DeliveryItem, InvoiceLine, InvoiceMetadata};
use crate::state::AppState;

/// Everything checkout needs, validated by the route before any network
/// call: a non-empty cart and a delivery email.
#[derive(Debug)]
pub struct CheckoutRequest {
    pub email: Email,
    pub identity_id: Option<String>,
    pub currency: CurrencyConfig,
    pub lines: Vec<CartLine>,
}

/// A successfully placed order, ready for redirect.
#[derive(Debug)]
pub struct PlacedOrder {
    pub reference: OrderReference,
    pub invoice_url: String,
}

/// Run the placement sequence.
///
/// # Errors
///
/// Returns `BadRequest` for an empty cart (before any network call), or
/// the first upstream error otherwise. By the time an error surfaces any
/// committed order record has been compensated to `cancelled`.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn place_order(
    state: &AppState,
    request: CheckoutRequest,
) -> Result<PlacedOrder, AppError> {
    if request.lines.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    // One reference shared by the catalog order and the invoice; the
    // webhook joins the two back together on it.
    let reference = OrderReference::from_timestamp_millis(Utc::now().timestamp_millis());

    // Resolve the identity id to the catalog's numeric user id. A user
    // the catalog has never seen is fine - the order just goes unlinked.
    let user = match request.identity_id.as_deref() {
        Some(identity_id) => state
            .catalog()
            .find_user_by_identity_id(identity_id)
            .await?
            .map(|user| user.id),
        None => None,
    };

    let subtotal: Decimal = request.lines.iter().map(CartLine::line_total).sum();
    let amount = request.currency.convert(subtotal);

    let order = state
        .catalog()
        .create_order(&reference, user, amount)
        .await?;

    // Items are independent once the parent exists; create them
    // concurrently.
    let results = join_all(request.lines.iter().map(|line| {
        state.catalog().create_order_item(
            order.id,
            line.product_id,
            line.quantity,
            line.unit_price,
        )
    }))
    .await;

    let mut failed = 0usize;
    for (line, result) in request.lines.iter().zip(&results) {
        if let Err(e) = result {
            failed += 1;
            tracing::error!(
                error = %e,
                product = %line.product_id,
                "Order item creation failed"
            );
        }
    }

    if failed > 0 {
        cancel_order(state, &order).await;
        return Err(AppError::Internal(format!(
            "{failed} of {} order items failed to create",
            request.lines.len()
        )));
    }

    let invoice_request = build_invoice(&request, &reference, amount, &state.config().base_url);

    let invoice = match state.invoicing().create_invoice(&invoice_request).await {
        Ok(invoice) => invoice,
        Err(e) => {
            cancel_order(state, &order).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        reference = %reference,
        invoice = %invoice.id,
        "Order placed, redirecting to hosted invoice"
    );

    Ok(PlacedOrder {
        reference,
        invoice_url: invoice.invoice_url,
    })
}

/// Compensate a committed order after a later step failed.
async fn cancel_order(state: &AppState, order: &Order) {
    let fields = serde_json::json!({ "orderStatus": "cancelled" });
    if let Err(e) = state.catalog().update_order(order, fields).await {
        // Compensation itself is best-effort; a pending order that could
        // not be cancelled stays behind as an orphan
        tracing::error!(
            error = %e,
            order = %order.id,
            "Order compensation failed"
        );
    }
}

fn build_invoice(
    request: &CheckoutRequest,
    reference: &OrderReference,
    amount: Decimal,
    base_url: &str,
) -> CreateInvoice {
    let payer = request
        .identity_id
        .clone()
        .unwrap_or_else(|| "Guest".to_string());

    CreateInvoice {
        external_id: reference.as_str().to_string(),
        amount,
        payer_email: request.email.as_str().to_string(),
        currency: request.currency.code.clone(),
        description: format!("Purchase by user {payer}"),
        success_redirect_url: format!("{base_url}/payment-success"),
        failure_redirect_url: format!("{base_url}/checkout"),
        items: request
            .lines
            .iter()
            .map(|line| InvoiceLine {
                name: line.name.clone(),
                quantity: line.quantity,
                price: request.currency.convert(line.unit_price),
            })
            .collect(),
        metadata: InvoiceMetadata {
            delivery: request
                .lines
                .iter()
                .map(|line| DeliveryItem {
                    file_id: line.file_id.clone(),
                    product_id: line.product_id,
                    name: line.name.clone(),
                })
                .collect(),
        },
    }
}
