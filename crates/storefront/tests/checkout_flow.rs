//! Order placement sequence against mocked collaborators.
//!
//! Covers: the exact converted figure reaching the invoicing provider,
//! identity-to-user resolution feeding the order link, the step order
//! (order, then items, then invoice), and saga compensation when the
//! invoice step fails after the order committed.

mod common;

use paperstack_core::{Email, FileId, ProductId};
use paperstack_storefront::models::cart::CartLine;
use paperstack_storefront::services::checkout::{CheckoutRequest, place_order};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::Collaborators;

fn php_58() -> paperstack_core::CurrencyConfig {
    paperstack_core::CurrencyConfig {
        code: "PHP".to_string(),
        symbol: "₱".to_string(),
        label: "Philippine Peso".to_string(),
        rate: Decimal::from(58),
        is_default: true,
        precision: 2,
    }
}

fn mixed_cart() -> Vec<CartLine> {
    vec![
        CartLine {
            product_id: ProductId::new(35),
            file_id: FileId::from("file-a"),
            name: "Atlas".to_string(),
            unit_price: Decimal::from(20),
            is_digital: true,
            quantity: 1,
        },
        CartLine {
            product_id: ProductId::new(36),
            file_id: FileId::from("file-b"),
            name: "Poster".to_string(),
            unit_price: Decimal::from(10),
            is_digital: false,
            quantity: 2,
        },
    ]
}

async fn servers() -> (MockServer, MockServer, MockServer, MockServer) {
    (
        MockServer::start().await,
        MockServer::start().await,
        MockServer::start().await,
        MockServer::start().await,
    )
}

#[tokio::test]
async fn checkout_sends_exact_converted_subtotal_to_provider() {
    let (catalog, invoicing, identity, storage) = servers().await;

    // Identity id resolves to catalog user 7
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("filters[identityId][$eq]", "idp_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "email": "buyer@example.com", "identityId": "idp_9" }
        ])))
        .expect(1)
        .mount(&catalog)
        .await;

    // Pending order created with the converted total and the user link
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({
            "data": { "orderStatus": "pending", "orderAmount": 2320.0, "user": 7 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 12, "documentId": "doc12", "transactionId": "placeholder", "orderStatus": "pending" }
        })))
        .expect(1)
        .mount(&catalog)
        .await;

    // One item per cart line, each carrying its price snapshot
    Mock::given(method("POST"))
        .and(path("/order-items"))
        .and(body_partial_json(json!({ "data": { "order": 12 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 1 } })))
        .expect(2)
        .mount(&catalog)
        .await;

    // (20*1 + 10*2) * 58 = 2320.00, sent as the invoice amount
    Mock::given(method("POST"))
        .and(path("/v2/invoices"))
        .and(body_partial_json(json!({
            "amount": 2320.0,
            "currency": "PHP",
            "payer_email": "buyer@example.com",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "inv_1",
            "invoice_url": "https://pay.test/inv_1",
            "status": "PENDING"
        })))
        .expect(1)
        .mount(&invoicing)
        .await;

    let state = common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    });

    let placed = place_order(
        &state,
        CheckoutRequest {
            email: Email::parse("buyer@example.com").expect("valid email"),
            identity_id: Some("idp_9".to_string()),
            currency: php_58(),
            lines: mixed_cart(),
        },
    )
    .await
    .expect("placement succeeds");

    assert_eq!(placed.invoice_url, "https://pay.test/inv_1");
    assert!(placed.reference.as_str().starts_with("order-"));
}

#[tokio::test]
async fn checkout_manifest_reaches_provider_metadata() {
    let (catalog, invoicing, identity, storage) = servers().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 12, "documentId": "doc12", "transactionId": "placeholder" }
        })))
        .mount(&catalog)
        .await;
    Mock::given(method("POST"))
        .and(path("/order-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 1 } })))
        .mount(&catalog)
        .await;

    // The structured correlation record travels in metadata, not in the
    // display items
    Mock::given(method("POST"))
        .and(path("/v2/invoices"))
        .and(body_partial_json(json!({
            "metadata": { "delivery": [
                { "file_id": "file-a", "product_id": 35, "name": "Atlas" },
                { "file_id": "file-b", "product_id": 36, "name": "Poster" }
            ]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "inv_2",
            "invoice_url": "https://pay.test/inv_2"
        })))
        .expect(1)
        .mount(&invoicing)
        .await;

    let state = common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    });

    place_order(
        &state,
        CheckoutRequest {
            email: Email::parse("buyer@example.com").expect("valid email"),
            identity_id: None,
            currency: php_58(),
            lines: mixed_cart(),
        },
    )
    .await
    .expect("placement succeeds");
}

#[tokio::test]
async fn invoice_failure_compensates_order_to_cancelled() {
    let (catalog, invoicing, identity, storage) = servers().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 13, "documentId": "doc13", "transactionId": "placeholder" }
        })))
        .expect(1)
        .mount(&catalog)
        .await;
    Mock::given(method("POST"))
        .and(path("/order-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 1 } })))
        .mount(&catalog)
        .await;

    // The committed order is compensated when the invoice step fails
    Mock::given(method("PUT"))
        .and(path("/orders/doc13"))
        .and(body_partial_json(json!({ "data": { "orderStatus": "cancelled" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 13 } })))
        .expect(1)
        .mount(&catalog)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/invoices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .expect(1)
        .mount(&invoicing)
        .await;

    let state = common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    });

    let result = place_order(
        &state,
        CheckoutRequest {
            email: Email::parse("buyer@example.com").expect("valid email"),
            identity_id: None,
            currency: php_58(),
            lines: mixed_cart(),
        },
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn empty_cart_is_rejected_before_any_network_call() {
    let (catalog, invoicing, identity, storage) = servers().await;

    let state = common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    });

    let result = place_order(
        &state,
        CheckoutRequest {
            email: Email::parse("buyer@example.com").expect("valid email"),
            identity_id: Some("idp_9".to_string()),
            currency: php_58(),
            lines: Vec::new(),
        },
    )
    .await;

    assert!(result.is_err());
    assert!(
        catalog
            .received_requests()
            .await
            .expect("request recording enabled")
            .is_empty()
    );
    assert!(
        invoicing
            .received_requests()
            .await
            .expect("request recording enabled")
            .is_empty()
    );
}
