//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use lettre::transport::smtp::Error as SmtpError;

use crate::catalog::CatalogClient;
use crate::config::StorefrontConfig;
use crate::services::drive::DriveClient;
use crate::services::email::EmailService;
use crate::services::identity::{IdentityClient, IdentityError};
use crate::services::orders::OrderHistory;
use crate::services::xendit::XenditClient;

/// Processed webhook events are remembered this long; the provider's
/// redelivery window is far shorter.
const EVENT_STORE_TTL_SECS: u64 = 24 * 60 * 60;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport: {0}")]
    Email(#[from] SmtpError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds one client per external
/// collaborator plus the in-memory stores that back stale-read tolerance
/// (order history) and webhook idempotency (processed events). State is
/// always passed explicitly - nothing here is a module-level singleton.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogClient,
    identity: IdentityClient,
    invoicing: XenditClient,
    storage: DriveClient,
    mailer: EmailService,
    orders: OrderHistory,
    processed_events: moka::sync::Cache<String, ()>,
}

impl AppState {
    /// Create a new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider client fails to construct.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = CatalogClient::new(&config.catalog);
        let identity = IdentityClient::new(&config.identity)?;
        let invoicing = XenditClient::new(&config.invoicing);
        let storage = DriveClient::new(&config.storage);
        let mailer = EmailService::new(&config.email)?;

        let processed_events = moka::sync::Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(EVENT_STORE_TTL_SECS))
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                identity,
                invoicing,
                storage,
                mailer,
                orders: OrderHistory::new(),
                processed_events,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog backend client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the invoicing provider client.
    #[must_use]
    pub fn invoicing(&self) -> &XenditClient {
        &self.inner.invoicing
    }

    /// Get a reference to the file-storage provider client.
    #[must_use]
    pub fn storage(&self) -> &DriveClient {
        &self.inner.storage
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn mailer(&self) -> &EmailService {
        &self.inner.mailer
    }

    /// Get a reference to the order-history cache.
    #[must_use]
    pub fn orders(&self) -> &OrderHistory {
        &self.inner.orders
    }

    /// Whether a provider event id has already been fulfilled.
    #[must_use]
    pub fn event_already_processed(&self, event_id: &str) -> bool {
        self.inner.processed_events.contains_key(event_id)
    }

    /// Record a provider event id as fulfilled.
    ///
    /// Called only after side effects complete, so a handler crash leaves
    /// the event eligible for redelivery.
    pub fn mark_event_processed(&self, event_id: &str) {
        self.inner.processed_events.insert(event_id.to_string(), ());
    }
}
