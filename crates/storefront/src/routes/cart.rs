//! Cart route handlers.
//!
//! The ledger itself lives in [`crate::models::cart`]; these handlers
//! load it from the session, apply one mutation, store it back, and
//! return a view priced in the visitor's selected currency.

use axum::{Json, extract::State};
use paperstack_core::{CurrencyConfig, FileId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::cart::Cart;
use crate::models::session::keys;
use crate::state::AppState;

use super::catalog::current_currency;

/// Load the session cart, starting empty when none exists.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart back into the session.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// One cart line, priced for display.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub file_id: FileId,
    pub name: String,
    pub quantity: u32,
    pub is_digital: bool,
    pub unit_price: String,
    pub line_total: String,
}

/// The cart, priced for display.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub currency: String,
}

impl CartView {
    fn render(cart: &Cart, currency: &CurrencyConfig) -> Self {
        Self {
            items: cart
                .lines()
                .map(|line| CartLineView {
                    file_id: line.file_id.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    is_digital: line.is_digital,
                    unit_price: currency.format(line.unit_price),
                    line_total: currency.format(line.line_total()),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: currency.format(cart.subtotal()),
            currency: currency.code.clone(),
        }
    }
}

async fn render_current(state: &AppState, session: &Session, cart: &Cart) -> Result<CartView> {
    let currency = current_currency(state, session).await?;
    Ok(CartView::render(cart, &currency))
}

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(render_current(&state, &session, &cart).await?))
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub file_id: FileId,
}

/// Add a product to the cart.
///
/// Fetches the product from the catalog so the line carries a price
/// snapshot. Re-adding a digital product is a silent no-op.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .product_by_file_id(&request.file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.file_id)))?;

    let mut cart = load_cart(&session).await?;
    cart.add_item(&product);
    save_cart(&session, &cart).await?;

    Ok(Json(render_current(&state, &session, &cart).await?))
}

/// Quantity-adjustment request.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub file_id: FileId,
    pub delta: i32,
}

/// Adjust a line's quantity by a delta.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(&request.file_id, request.delta);
    save_cart(&session, &cart).await?;

    Ok(Json(render_current(&state, &session, &cart).await?))
}

/// Line-removal request.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub file_id: FileId,
}

/// Remove a line from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.remove_item(&request.file_id);
    save_cart(&session, &cart).await?;

    Ok(Json(render_current(&state, &session, &cart).await?))
}

/// Cart count badge.
#[derive(Debug, Serialize)]
pub struct CountView {
    pub count: u32,
}

/// Unit count across all lines.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CountView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CountView {
        count: cart.item_count(),
    }))
}
