//! Cart and currency behavior through the HTTP surface, with session
//! cookies carried across requests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::Collaborators;

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("json body")
}

fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(String::from)
}

fn post_json(uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn catalog_with_fixtures() -> MockServer {
    let catalog = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("filters[productId][$eq]", "file-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": 35,
                "name": "Atlas",
                "price": 20,
                "productId": "file-a",
                "isDigital": true,
                "thumbnail": "https://cdn.test/atlas.png"
            }]
        })))
        .mount(&catalog)
        .await;

    Mock::given(method("GET"))
        .and(path("/currency-settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "code": "PHP",
                    "symbol": "₱",
                    "label": "Philippine Peso",
                    "rate": 58.0,
                    "isDefault": true,
                    "precision": 2
                },
                {
                    "code": "USD",
                    "symbol": "$",
                    "label": "US Dollar",
                    "rate": 1.0,
                    "isDefault": false,
                    "precision": 2
                }
            ]
        })))
        .mount(&catalog)
        .await;

    catalog
}

#[tokio::test]
async fn digital_item_stays_at_quantity_one_across_repeated_adds() {
    let catalog = catalog_with_fixtures().await;
    let invoicing = MockServer::start().await;
    let identity = MockServer::start().await;
    let storage = MockServer::start().await;

    let app = paperstack_storefront::routes::app(common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    }));

    let add_body = json!({ "file_id": "file-a" });

    let first = app
        .clone()
        .oneshot(post_json("/api/cart/add", &add_body, None))
        .await
        .expect("handler runs");
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first).expect("session cookie issued");

    // Re-adding a digital product is a silent no-op
    let second = app
        .clone()
        .oneshot(post_json("/api/cart/add", &add_body, Some(&cookie)))
        .await
        .expect("handler runs");
    assert_eq!(second.status(), StatusCode::OK);

    let view = read_json(second).await;
    assert_eq!(view["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(view["items"][0]["quantity"], 1);
    assert_eq!(view["item_count"], 1);
    // 20 canonical at the default PHP rate 58
    assert_eq!(view["subtotal"], "₱1,160.00");
    assert_eq!(view["currency"], "PHP");
}

#[tokio::test]
async fn currency_selection_persists_in_the_session() {
    let catalog = catalog_with_fixtures().await;
    let invoicing = MockServer::start().await;
    let identity = MockServer::start().await;
    let storage = MockServer::start().await;

    let app = paperstack_storefront::routes::app(common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    }));

    let select = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/session/currency")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "code": "USD" }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("handler runs");
    assert_eq!(select.status(), StatusCode::OK);
    let cookie = session_cookie(&select).expect("session cookie issued");

    let add = app
        .clone()
        .oneshot(post_json(
            "/api/cart/add",
            &json!({ "file_id": "file-a" }),
            Some(&cookie),
        ))
        .await
        .expect("handler runs");

    let view = read_json(add).await;
    assert_eq!(view["currency"], "USD");
    assert_eq!(view["subtotal"], "$20.00");
}

#[tokio::test]
async fn unknown_currency_is_rejected() {
    let catalog = catalog_with_fixtures().await;
    let invoicing = MockServer::start().await;
    let identity = MockServer::start().await;
    let storage = MockServer::start().await;

    let app = paperstack_storefront::routes::app(common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    }));

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/session/currency")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "code": "EUR" }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("handler runs");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_rejects_empty_cart_before_contacting_providers() {
    let catalog = catalog_with_fixtures().await;
    let invoicing = MockServer::start().await;
    let identity = MockServer::start().await;
    let storage = MockServer::start().await;

    let app = paperstack_storefront::routes::app(common::test_state(&Collaborators {
        catalog: &catalog.uri(),
        invoicing: &invoicing.uri(),
        identity: &identity.uri(),
        storage: &storage.uri(),
    }));

    let response = app
        .oneshot(post_json(
            "/api/payment",
            &json!({ "email": "buyer@example.com" }),
            None,
        ))
        .await
        .expect("handler runs");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        invoicing
            .received_requests()
            .await
            .expect("request recording enabled")
            .is_empty()
    );
}
