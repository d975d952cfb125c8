//! Catalog mirror and currency-selection route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use paperstack_core::{CurrencyConfig, FileId, SubCategoryId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::catalog::types::{Category, Product};
use crate::error::{AppError, Result};
use crate::models::session::keys;
use crate::state::AppState;

/// The currency used when the catalog offers none.
pub(crate) fn fallback_currency() -> CurrencyConfig {
    CurrencyConfig {
        code: "PHP".to_string(),
        symbol: "₱".to_string(),
        label: "Philippine Peso".to_string(),
        rate: Decimal::ONE,
        is_default: true,
        precision: 2,
    }
}

/// Resolve the session's display currency.
///
/// Order: the persisted selection (when it still exists in the catalog),
/// then the default-flagged config, then the first available, then the
/// static fallback. A catalog failure is logged and treated as an empty
/// config list - price display must not take the page down.
pub(crate) async fn current_currency(
    state: &AppState,
    session: &Session,
) -> Result<CurrencyConfig> {
    let configs = match state.catalog().currency_settings().await {
        Ok(configs) => configs,
        Err(e) => {
            tracing::warn!(error = %e, "Currency settings fetch failed, using fallback");
            Vec::new()
        }
    };

    if let Some(code) = session.get::<String>(keys::CURRENCY).await?
        && let Some(config) = configs.iter().find(|config| config.code == code)
    {
        return Ok(config.clone());
    }

    if let Some(config) = configs.iter().find(|config| config.is_default) {
        return Ok(config.clone());
    }

    Ok(configs.into_iter().next().unwrap_or_else(fallback_currency))
}

/// List categories with their sub-categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// Product listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub sub_category: Option<i32>,
}

/// List products, optionally narrowed to one sub-category.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let sub_category = query.sub_category.map(SubCategoryId::new);
    Ok(Json(state.catalog().products(sub_category).await?))
}

/// Fetch a single product by file id.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Product>> {
    let file_id = FileId::from(file_id);
    state
        .catalog()
        .product_by_file_id(&file_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {file_id}")))
}

/// List selectable currencies.
#[instrument(skip(state))]
pub async fn currencies(State(state): State<AppState>) -> Result<Json<Vec<CurrencyConfig>>> {
    Ok(Json(state.catalog().currency_settings().await?))
}

/// Currency-selection request.
#[derive(Debug, Deserialize)]
pub struct SelectCurrency {
    pub code: String,
}

/// Persist the visitor's display currency in the session.
///
/// Unknown codes are rejected; the prior selection stays in place.
#[instrument(skip(state, session))]
pub async fn select_currency(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SelectCurrency>,
) -> Result<Json<CurrencyConfig>> {
    let configs = state.catalog().currency_settings().await?;
    let Some(config) = configs.into_iter().find(|config| config.code == request.code) else {
        return Err(AppError::BadRequest(format!(
            "unknown currency: {}",
            request.code
        )));
    };

    session.insert(keys::CURRENCY, &config.code).await?;
    Ok(Json(config))
}
