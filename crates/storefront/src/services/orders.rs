//! Order history view.
//!
//! A read-only, stale-tolerant projection of a user's past orders. Each
//! email's list is refreshed from the catalog at most once an hour (and
//! on first request); when a refresh fails the previous list is served
//! unchanged. Only when there is no previous list does the failure
//! surface to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::instrument;

use crate::catalog::types::Order;
use crate::catalog::{CatalogClient, CatalogError};

/// How long a fetched list stays fresh.
const REFRESH_INTERVAL_SECS: i64 = 60 * 60;

#[derive(Clone)]
struct CachedOrders {
    fetched_at: DateTime<Utc>,
    orders: Arc<Vec<Order>>,
}

/// Stale-tolerant per-email order cache.
#[derive(Clone)]
pub struct OrderHistory {
    cache: Cache<String, CachedOrders>,
}

impl Default for OrderHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderHistory {
    /// Create an empty order-history cache.
    #[must_use]
    pub fn new() -> Self {
        // No TTL: stale entries must survive to back failed refreshes
        Self {
            cache: Cache::builder().max_capacity(10_000).build(),
        }
    }

    /// The user's orders, refreshed when the cached copy is older than
    /// an hour.
    ///
    /// # Errors
    ///
    /// Returns an error only when the catalog fetch fails and no prior
    /// list exists for this email.
    #[instrument(skip(self, catalog, email))]
    pub async fn for_email(
        &self,
        catalog: &CatalogClient,
        email: &str,
    ) -> Result<Arc<Vec<Order>>, CatalogError> {
        let key = email.to_lowercase();
        let cached = self.cache.get(&key).await;

        if let Some(entry) = &cached {
            let age = Utc::now() - entry.fetched_at;
            if age.num_seconds() < REFRESH_INTERVAL_SECS {
                return Ok(Arc::clone(&entry.orders));
            }
        }

        match catalog.orders_for_email(email).await {
            Ok(orders) => {
                let entry = CachedOrders {
                    fetched_at: Utc::now(),
                    orders: Arc::new(orders),
                };
                self.cache.insert(key, entry.clone()).await;
                Ok(entry.orders)
            }
            Err(e) => match cached {
                Some(entry) => {
                    tracing::warn!(error = %e, "Order refresh failed, serving stale list");
                    Ok(entry.orders)
                }
                None => Err(e),
            },
        }
    }

    /// Drop one email's cached list (after a confirmed purchase, so the
    /// next view reflects the new order immediately).
    pub async fn invalidate(&self, email: &str) {
        self.cache.invalidate(&email.to_lowercase()).await;
    }
}
