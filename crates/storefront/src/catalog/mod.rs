//! Catalog backend client.
//!
//! # Architecture
//!
//! - The catalog is the system of record for users, products, orders,
//!   and currency settings - this service never stores them locally
//! - Read-mostly collections (categories, products, currencies) are
//!   mirrored through an in-memory `moka` cache (5 minute TTL)
//! - Lookups feeding mutations (users, orders) always hit the backend
//!
//! # Example
//!
//! ```rust,ignore
//! use paperstack_storefront::catalog::CatalogClient;
//!
//! let catalog = CatalogClient::new(&config.catalog);
//! let products = catalog.products(None).await?;
//! let user = catalog.find_user_by_email("buyer@example.com").await?;
//! ```

pub mod types;

mod cache;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use paperstack_core::{
    CategoryId, CurrencyConfig, FileId, OrderId, OrderReference, ProductId, SubCategoryId, UserId,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CatalogConfig;

use cache::CacheValue;
use types::{CatalogUser, Category, Document, Order, Product, SubCategory};

/// Errors that can occur when talking to the catalog backend.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("Catalog API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for the catalog backend's REST collections.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_token: config.api_token.expose_secret().to_string(),
                cache,
            }),
        }
    }

    // =========================================================================
    // Transport helpers
    // =========================================================================

    async fn read_body(response: reqwest::Response) -> Result<String, CatalogError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, CatalogError> {
        let url = format!("{}/{path_and_query}", self.inner.base_url);
        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(&self.inner.api_token)
            .send()
            .await?;

        let text = Self::read_body(response).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET a collection path, unwrapping the `{ "data": [...] }` envelope.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<Vec<T>, CatalogError> {
        let doc: Document<Vec<T>> = self.get_json(path_and_query).await?;
        Ok(doc.data)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        body: &serde_json::Value,
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{path_and_query}", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(&self.inner.api_token)
            .json(body)
            .send()
            .await?;

        let text = Self::read_body(response).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn put_json(
        &self,
        path_and_query: &str,
        body: &serde_json::Value,
    ) -> Result<(), CatalogError> {
        let url = format!("{}/{path_and_query}", self.inner.base_url);
        let response = self
            .inner
            .client
            .put(&url)
            .bearer_auth(&self.inner.api_token)
            .json(body)
            .send()
            .await?;

        Self::read_body(response).await?;
        Ok(())
    }

    // =========================================================================
    // Mirror reads (cached)
    // =========================================================================

    /// All categories with their sub-categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .get_list("categories?populate=sub_categories&pagination[pageSize]=100")
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Products, optionally narrowed to one sub-category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(
        &self,
        sub_category: Option<SubCategoryId>,
    ) -> Result<Vec<Product>, CatalogError> {
        let cache_key = format!(
            "products:{}",
            sub_category.map_or_else(String::new, |id| id.to_string())
        );

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut path = "products?pagination[pageSize]=100".to_string();
        if let Some(id) = sub_category {
            path.push_str(&format!("&filters[sub_category][id][$eq]={id}"));
        }

        let products: Vec<Product> = self.get_list(&path).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Look up a single product by its file-storage id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn product_by_file_id(
        &self,
        file_id: &FileId,
    ) -> Result<Option<Product>, CatalogError> {
        let cache_key = format!("product:{file_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let path = format!(
            "products?filters[productId][$eq]={}",
            urlencoding::encode(file_id.as_str())
        );
        let product = self.get_list::<Product>(&path).await?.into_iter().next();

        if let Some(product) = &product {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }

        Ok(product)
    }

    /// All selectable currency configurations.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn currency_settings(&self) -> Result<Vec<CurrencyConfig>, CatalogError> {
        let cache_key = "currencies".to_string();

        if let Some(CacheValue::Currencies(currencies)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for currencies");
            return Ok(currencies);
        }

        let currencies: Vec<CurrencyConfig> = self
            .get_list("currency-settings?pagination[pageSize]=100")
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Currencies(currencies.clone()))
            .await;

        Ok(currencies)
    }

    /// Drop every mirrored entry (after a sync run changes the catalog).
    pub async fn invalidate_mirror(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Cheap reachability probe for the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        self.get_list::<Category>("categories?pagination[pageSize]=1")
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Find a user by email, with the purchased relation populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CatalogUser>, CatalogError> {
        let path = format!(
            "users?filters[email][$eq]={}&populate=purchased",
            urlencoding::encode(email)
        );
        // The users collection returns a bare array, not a data envelope
        let users: Vec<CatalogUser> = self.get_json(&path).await?;
        Ok(users.into_iter().next())
    }

    /// Find a user by their identity-provider id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity_id))]
    pub async fn find_user_by_identity_id(
        &self,
        identity_id: &str,
    ) -> Result<Option<CatalogUser>, CatalogError> {
        let path = format!(
            "users?filters[identityId][$eq]={}",
            urlencoding::encode(identity_id)
        );
        let users: Vec<CatalogUser> = self.get_json(&path).await?;
        Ok(users.into_iter().next())
    }

    /// Create a user record (from an identity-provider `user.created` event).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email, username))]
    pub async fn create_user(
        &self,
        email: &str,
        identity_id: &str,
        username: &str,
    ) -> Result<CatalogUser, CatalogError> {
        // The users-permissions collection requires a password even though
        // sign-in happens entirely at the identity provider
        let placeholder_password = uuid::Uuid::new_v4().simple().to_string();

        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": placeholder_password,
            "identityId": identity_id,
            "confirmed": true,
            "role": 1,
        });

        self.post_json("users", &body).await
    }

    /// Replace a user's purchased relation with the given product ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, product_ids), fields(user = %user))]
    pub async fn set_user_purchased(
        &self,
        user: UserId,
        product_ids: &[ProductId],
    ) -> Result<(), CatalogError> {
        // Bare body: the users collection does not take a data envelope
        let body = serde_json::json!({ "purchased": product_ids });
        self.put_json(&format!("users/{user}"), &body).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create a pending order carrying the checkout correlation reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn create_order(
        &self,
        reference: &OrderReference,
        user: Option<UserId>,
        amount: Decimal,
    ) -> Result<Order, CatalogError> {
        let body = serde_json::json!({
            "data": {
                "transactionId": reference.as_str(),
                "orderStatus": "pending",
                "user": user.map(|user| user.as_i32()),
                "orderAmount": amount.to_f64(),
            }
        });

        let doc: Document<Order> = self.post_json("orders", &body).await?;
        Ok(doc.data)
    }

    /// Find an order by its correlation reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn find_order_by_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<Order>, CatalogError> {
        let path = format!(
            "orders?filters[transactionId][$eq]={}",
            urlencoding::encode(reference.as_str())
        );
        Ok(self.get_list::<Order>(&path).await?.into_iter().next())
    }

    /// Update order fields (status transitions, settlement details).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, fields), fields(order = %order.id))]
    pub async fn update_order(
        &self,
        order: &Order,
        fields: serde_json::Value,
    ) -> Result<(), CatalogError> {
        let body = serde_json::json!({ "data": fields });
        self.put_json(&format!("orders/{}", order.path_id()), &body)
            .await
    }

    /// Create one order item under an existing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(order = %order, product = %product))]
    pub async fn create_order_item(
        &self,
        order: OrderId,
        product: ProductId,
        quantity: u32,
        price_at_purchase: Decimal,
    ) -> Result<(), CatalogError> {
        let body = serde_json::json!({
            "data": {
                "product": product.as_i32(),
                "order": order.as_i32(),
                "priceAtPurchase": price_at_purchase.to_f64(),
                "quantity": quantity,
            }
        });

        self.post_json::<serde_json::Value>("order-items", &body)
            .await
            .map(|_| ())
    }

    /// All orders belonging to a user email, items and products populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, CatalogError> {
        let path = format!(
            "orders?filters[user][email][$eq]={}&populate[order_items][populate]=product&sort=createdAt:desc",
            urlencoding::encode(email)
        );
        self.get_list(&path).await
    }

    // =========================================================================
    // Sync lookups (draft entries included)
    // =========================================================================

    /// Find a category mirroring a storage folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn find_category_by_folder(
        &self,
        folder: &FileId,
    ) -> Result<Option<Category>, CatalogError> {
        let path = format!(
            "categories?filters[categoryId][$eq]={}&status=draft",
            urlencoding::encode(folder.as_str())
        );
        Ok(self.get_list::<Category>(&path).await?.into_iter().next())
    }

    /// Create a draft category for a storage folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_category(
        &self,
        name: &str,
        folder: &FileId,
    ) -> Result<Category, CatalogError> {
        let body = serde_json::json!({
            "data": { "name": name, "categoryId": folder.as_str() }
        });
        let doc: Document<Category> = self.post_json("categories?status=draft", &body).await?;
        Ok(doc.data)
    }

    /// Find a sub-category mirroring a storage folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn find_sub_category_by_folder(
        &self,
        folder: &FileId,
    ) -> Result<Option<SubCategory>, CatalogError> {
        let path = format!(
            "sub-categories?filters[subCategoryId][$eq]={}&status=draft",
            urlencoding::encode(folder.as_str())
        );
        Ok(self
            .get_list::<SubCategory>(&path)
            .await?
            .into_iter()
            .next())
    }

    /// Create a draft sub-category under a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_sub_category(
        &self,
        name: &str,
        folder: &FileId,
        category: CategoryId,
    ) -> Result<SubCategory, CatalogError> {
        let body = serde_json::json!({
            "data": {
                "name": name,
                "subCategoryId": folder.as_str(),
                "category": category.as_i32(),
            }
        });
        let doc: Document<SubCategory> =
            self.post_json("sub-categories?status=draft", &body).await?;
        Ok(doc.data)
    }

    /// Find a product mirroring a storage file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn find_product_by_file(
        &self,
        file: &FileId,
    ) -> Result<Option<Product>, CatalogError> {
        let path = format!(
            "products?filters[productId][$eq]={}&status=draft",
            urlencoding::encode(file.as_str())
        );
        Ok(self.get_list::<Product>(&path).await?.into_iter().next())
    }

    /// Create a draft digital product for a storage file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_product(
        &self,
        name: &str,
        file: &FileId,
        sub_category: SubCategoryId,
    ) -> Result<Product, CatalogError> {
        let body = serde_json::json!({
            "data": {
                "name": name,
                "productId": file.as_str(),
                "sub_category": sub_category.as_i32(),
                "isDigital": true,
            }
        });
        let doc: Document<Product> = self.post_json("products?status=draft", &body).await?;
        Ok(doc.data)
    }
}
