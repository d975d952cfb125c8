//! Cache values for the catalog mirror.

use paperstack_core::CurrencyConfig;

use super::types::{Category, Product};

/// Cached catalog responses (read-mostly collections only; write paths
/// and user/order lookups are never cached).
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Products(Vec<Product>),
    Product(Box<Product>),
    Currencies(Vec<CurrencyConfig>),
}
