//! Invoicing provider client (Xendit v2 invoices).
//!
//! Checkout creates one hosted invoice per order; the customer pays on
//! the provider's page and the provider calls our webhook. The invoice
//! carries two parallel views of the cart: display line items (shown on
//! the hosted page) and a structured delivery manifest in `metadata`,
//! which is what the webhook trusts for fulfillment.

use paperstack_core::{FileId, ProductId};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::InvoicingConfig;

/// Errors that can occur when talking to the invoicing provider.
#[derive(Debug, Error)]
pub enum XenditError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("Invoicing API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One display line on the hosted invoice page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: u32,
    /// Unit price in the invoice currency.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// One entry of the structured delivery manifest.
///
/// Carries everything the webhook needs to fulfill an item: the
/// file-storage id to grant and the catalog product id to merge into the
/// buyer's purchased set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub file_id: FileId,
    pub product_id: ProductId,
    pub name: String,
}

/// Invoice metadata: echoed back verbatim in callbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    #[serde(default)]
    pub delivery: Vec<DeliveryItem>,
}

/// Request body for invoice creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoice {
    pub external_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payer_email: String,
    pub currency: String,
    pub description: String,
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub items: Vec<InvoiceLine>,
    pub metadata: InvoiceMetadata,
}

/// A created invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Webhook callback payload for invoice status changes.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceCallback {
    /// Provider payment/invoice id (the idempotency key).
    pub id: String,
    /// Our correlation reference, echoed back.
    pub external_id: String,
    /// Invoice status; fulfillment runs only on `PAID`.
    pub status: String,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub payment_channel: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub metadata: Option<InvoiceMetadata>,
}

impl InvoiceCallback {
    /// True when the provider reports the invoice settled.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == "PAID"
    }

    /// The payment channel to record on the order, preferring the more
    /// specific `payment_channel` over `payment_method`.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.payment_channel
            .as_deref()
            .or(self.payment_method.as_deref())
    }
}

/// Invoicing provider API client.
#[derive(Clone)]
pub struct XenditClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl XenditClient {
    /// Create a new invoicing client.
    #[must_use]
    pub fn new(config: &InvoicingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.expose_secret().to_string(),
        }
    }

    /// Create a hosted invoice and return its payment URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or is rejected.
    #[instrument(skip(self, request), fields(external_id = %request.external_id))]
    pub async fn create_invoice(&self, request: &CreateInvoice) -> Result<Invoice, XenditError> {
        let url = format!("{}/v2/invoices", self.api_url);

        let response = self
            .client
            .post(&url)
            // Secret key as the Basic username, empty password
            .basic_auth(&self.secret_key, Some(""))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(XenditError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        response
            .json::<Invoice>()
            .await
            .map_err(|e| XenditError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use paperstack_core::ProductId;

    #[test]
    fn test_invoice_amount_serializes_as_number() {
        let request = CreateInvoice {
            external_id: "order-1".to_string(),
            amount: Decimal::new(232_000, 2), // 2320.00
            payer_email: "buyer@example.com".to_string(),
            currency: "PHP".to_string(),
            description: "Purchase by user idp_9".to_string(),
            success_redirect_url: "https://shop.test/payment-success".to_string(),
            failure_redirect_url: "https://shop.test/checkout".to_string(),
            items: vec![InvoiceLine {
                name: "Atlas".to_string(),
                quantity: 1,
                price: Decimal::new(116_000, 2),
            }],
            metadata: InvoiceMetadata {
                delivery: vec![DeliveryItem {
                    file_id: FileId::from("file-a"),
                    product_id: ProductId::new(35),
                    name: "Atlas".to_string(),
                }],
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount"], serde_json::json!(2320.0));
        assert_eq!(value["items"][0]["price"], serde_json::json!(1160.0));
        assert_eq!(value["metadata"]["delivery"][0]["file_id"], "file-a");
        assert_eq!(value["metadata"]["delivery"][0]["product_id"], 35);
    }

    #[test]
    fn test_callback_paid_and_channel() {
        let callback: InvoiceCallback = serde_json::from_str(
            r#"{
                "id": "inv_1",
                "external_id": "order-1",
                "status": "PAID",
                "paid_at": "2026-01-05T10:00:00.000Z",
                "payment_method": "EWALLET",
                "payment_channel": "GCASH",
                "payer_email": "buyer@example.com",
                "metadata": {"delivery": [{"file_id": "file-a", "product_id": 35, "name": "Atlas"}]}
            }"#,
        )
        .unwrap();

        assert!(callback.is_paid());
        assert_eq!(callback.channel(), Some("GCASH"));
        assert_eq!(callback.metadata.unwrap().delivery.len(), 1);
    }

    #[test]
    fn test_callback_without_metadata() {
        let callback: InvoiceCallback = serde_json::from_str(
            r#"{"id": "inv_2", "external_id": "order-2", "status": "EXPIRED"}"#,
        )
        .unwrap();
        assert!(!callback.is_paid());
        assert!(callback.metadata.is_none());
        assert_eq!(callback.channel(), None);
    }
}
