//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::{CatalogClient, CatalogError, ProductSource};
use crate::config::StorefrontConfig;
use crate::firestore::FirestoreOrderStore;
use crate::orders::{OrderAggregator, SessionCustomerResolver};
use crate::stripe::StripeClient;

/// Error building the upstream API clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
}

/// Order aggregator as wired for HTTP requests.
pub type SessionOrderAggregator = OrderAggregator<SessionCustomerResolver>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the session database pool and upstream clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    orders: SessionOrderAggregator,
    catalog: Arc<dyn ProductSource>,
}

impl AppState {
    /// Create a new application state with the production clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let orders = OrderAggregator::new(
            SessionCustomerResolver,
            Arc::new(FirestoreOrderStore::new(&config.firestore)?),
            Arc::new(StripeClient::new(&config.stripe)?),
            config.order_history.clone(),
        );
        let catalog = Arc::new(CatalogClient::new(&config.catalog)?);

        Ok(Self::from_parts(config, pool, orders, catalog))
    }

    /// Create application state from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        pool: PgPool,
        orders: SessionOrderAggregator,
        catalog: Arc<dyn ProductSource>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                orders,
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the order history aggregator.
    #[must_use]
    pub fn orders(&self) -> &SessionOrderAggregator {
        &self.inner.orders
    }

    /// Get the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ProductSource {
        self.inner.catalog.as_ref()
    }
}
