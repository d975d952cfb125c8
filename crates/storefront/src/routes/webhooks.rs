//! Webhook route handlers.
//!
//! Two inbound surfaces: the invoicing provider's payment callbacks
//! (authenticated by a shared-secret header) and the identity provider's
//! user events (authenticated by an HMAC signature over the raw body).
//! Both checks run before anything is parsed into a mutation.

use axum::{Json, extract::State, http::HeaderMap};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::fulfillment::confirm_payment;
use crate::services::xendit::InvoiceCallback;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Invoicing provider callback.
///
/// The `x-callback-token` header MUST match the configured secret before
/// any mutation; a mismatch is a 401 with zero side effects. The
/// response is 200 even when the correlation id matches no order - the
/// provider only needs to know the delivery was accepted.
#[instrument(skip(state, headers, callback))]
pub async fn payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(callback): Json<InvoiceCallback>,
) -> Result<Json<serde_json::Value>> {
    let provided = headers
        .get("x-callback-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let expected = state.config().invoicing.callback_token.expose_secret();

    if provided.is_empty() || provided != expected {
        return Err(AppError::Unauthorized("invalid callback token".to_string()));
    }

    let outcome = confirm_payment(&state, callback).await?;
    Ok(Json(serde_json::json!({ "status": outcome.as_str() })))
}

/// An identity-provider event envelope.
#[derive(Debug, serde::Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: IdentityEventData,
}

/// Payload of a user event.
#[derive(Debug, serde::Deserialize)]
pub struct IdentityEventData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<IdentityEmailAddress>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct IdentityEmailAddress {
    pub email_address: String,
}

/// Identity provider webhook.
///
/// On `user.created`, creates the matching catalog user record so later
/// identity lookups and order links resolve. Other event kinds are
/// acknowledged and dropped.
#[instrument(skip(state, headers, body))]
pub async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>> {
    let secret = state.config().identity.webhook_secret.expose_secret();

    let msg_id = header_value(&headers, "svix-id");
    let timestamp = header_value(&headers, "svix-timestamp");
    let signatures = header_value(&headers, "svix-signature");

    if !verify_signature(secret, msg_id, timestamp, signatures, &body) {
        return Err(AppError::BadRequest("invalid signature".to_string()));
    }

    let event: IdentityEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed event: {e}")))?;

    if event.kind == "user.created" {
        let Some(email) = event
            .data
            .email_addresses
            .first()
            .map(|address| address.email_address.clone())
        else {
            return Err(AppError::BadRequest("event has no email address".to_string()));
        };

        // OAuth sign-ups often have no username; derive one from the
        // email local part plus an id suffix for uniqueness
        let username = event.data.username.clone().unwrap_or_else(|| {
            let local = email.split('@').next().unwrap_or_default();
            let suffix: String = event
                .data
                .id
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("{local}{suffix}")
        });

        state
            .catalog()
            .create_user(&email, &event.data.id, &username)
            .await?;

        tracing::info!(identity_id = %event.data.id, "Catalog user created from identity event");
    }

    Ok(Json(serde_json::json!({ "status": "processed" })))
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> &'h str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Verify an HMAC-signed webhook.
///
/// The signed content is `{id}.{timestamp}.{payload}`; the key is the
/// base64 part of the `whsec_`-prefixed secret; the signature header
/// holds space-separated `v1,<base64>` candidates, any one of which may
/// match.
fn verify_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    signature_header: &str,
    payload: &str,
) -> bool {
    if msg_id.is_empty() || timestamp.is_empty() || signature_header.is_empty() {
        return false;
    }

    let Ok(key) = BASE64.decode(secret.trim_start_matches("whsec_")) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };

    mac.update(format!("{msg_id}.{timestamp}.{payload}").as_bytes());

    signature_header.split_whitespace().any(|candidate| {
        candidate
            .strip_prefix("v1,")
            .and_then(|encoded| BASE64.decode(encoded).ok())
            .is_some_and(|signature| {
                mac.clone().verify_slice(&signature).is_ok()
            })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY_BYTES: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn secret() -> String {
        format!("whsec_{}", BASE64.encode(KEY_BYTES))
    }

    fn sign(msg_id: &str, timestamp: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(KEY_BYTES).unwrap();
        mac.update(format!("{msg_id}.{timestamp}.{payload}").as_bytes());
        format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = r#"{"type":"user.created"}"#;
        let signature = sign("msg_1", "1700000000", payload);
        assert!(verify_signature(
            &secret(),
            "msg_1",
            "1700000000",
            &signature,
            payload
        ));
    }

    #[test]
    fn test_any_candidate_may_match() {
        let payload = r#"{"type":"user.created"}"#;
        let good = sign("msg_1", "1700000000", payload);
        let header = format!("v1,AAAA {good}");
        assert!(verify_signature(
            &secret(),
            "msg_1",
            "1700000000",
            &header,
            payload
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let signature = sign("msg_1", "1700000000", r#"{"type":"user.created"}"#);
        assert!(!verify_signature(
            &secret(),
            "msg_1",
            "1700000000",
            &signature,
            r#"{"type":"user.deleted"}"#
        ));
    }

    #[test]
    fn test_missing_headers_fail() {
        assert!(!verify_signature(&secret(), "", "", "", "{}"));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = "{}";
        let signature = sign("msg_1", "1700000000", payload);
        let other = format!("whsec_{}", BASE64.encode(b"another-key-another-key-another!"));
        assert!(!verify_signature(
            &other,
            "msg_1",
            "1700000000",
            &signature,
            payload
        ));
    }
}
