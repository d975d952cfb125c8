//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (probes the catalog)
//!
//! # Auth (identity bridge)
//! POST   /api/auth/session         - Verify provider token, sync profile
//! GET    /api/auth/me              - Current profile (stale-tolerant re-sync)
//! DELETE /api/auth/session         - Revoke provider session, clear state
//!
//! # Catalog mirror
//! GET  /api/categories             - Categories with sub-categories
//! GET  /api/products               - Products (optional ?sub_category=)
//! GET  /api/products/{file_id}     - Single product
//! GET  /api/currencies             - Selectable currency configs
//! PUT  /api/session/currency       - Select display currency
//!
//! # Cart
//! GET  /api/cart                   - Cart view in the selected currency
//! POST /api/cart/add               - Add product (digital capped at 1)
//! POST /api/cart/update            - Adjust quantity by delta
//! POST /api/cart/remove            - Remove a line
//! GET  /api/cart/count             - Unit count badge
//!
//! # Checkout & payment
//! POST /api/payment                - Place order, returns hosted invoice URL
//! POST /api/payment/confirm        - Bounded poll for fulfillment
//! POST /api/payment/webhook        - Invoicing provider callback
//!
//! # Webhooks & sync
//! POST /api/webhooks/identity      - Identity provider events (signed)
//! GET  /api/sync/categories        - Mirror storage folders into categories
//! GET  /api/sync/subcategories     - Mirror into sub-categories
//! GET  /api/sync/products          - Mirror files into draft products
//!
//! # Orders
//! GET  /api/orders                 - Order history (hourly refresh, stale ok)
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod sync;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(auth::establish).delete(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog mirror routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{file_id}", get(catalog::product))
        .route("/currencies", get(catalog::currencies))
        .route("/session/currency", put(catalog::select_currency))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::create))
        .route("/confirm", post(checkout::confirm))
        .route("/webhook", post(webhooks::payment))
}

/// Create the sync routes router.
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(sync::categories))
        .route("/subcategories", get(sync::sub_categories))
        .route("/products", get(sync::products))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api", catalog_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/payment", payment_routes())
        .nest("/api/sync", sync_routes())
        .route("/api/orders", get(orders::index))
        .route("/api/webhooks/identity", post(webhooks::identity))
}

/// Assemble the full application: routes, request-id middleware, session
/// layer, and state. The binary adds health endpoints and Sentry layers
/// on top; tests drive this router directly.
pub fn app(state: AppState) -> Router {
    let session_layer = crate::middleware::create_session_layer(&state.config().base_url);

    Router::new()
        .merge(routes())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_id_middleware,
        ))
        .layer(session_layer)
        .with_state(state)
}
