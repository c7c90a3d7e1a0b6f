//! Product catalog client.
//!
//! The catalog is an external, unauthenticated API serving the full listing
//! at `GET /items`. The listing changes rarely, so it is cached in memory
//! (`moka`, 5 minute TTL) and shared by every request.

pub mod types;

pub use types::Product;

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::CatalogConfig;

/// Errors that can occur when fetching the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("catalog returned HTTP {0}")]
    Status(u16),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot be extended with `/items`.
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Source of the product listing.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// List every product, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the listing cannot be fetched or parsed.
    async fn list_products(&self) -> Result<Arc<Vec<Product>>, CatalogError>;
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct ListingKey;

/// Client for the catalog API.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    items_url: Url,
    cache: Cache<ListingKey, Arc<Vec<Product>>>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] if the base URL cannot be joined
    /// with `items`.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                items_url: items_url(&config.api_url)?,
                cache,
            }),
        })
    }

    async fn fetch(&self) -> Result<Vec<Product>, CatalogError> {
        let response = self
            .inner
            .client
            .get(self.inner.items_url.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Catalog API returned non-success status");
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ProductSource for CatalogClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(products) = self.inner.cache.get(&ListingKey).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let products = Arc::new(self.fetch().await?);
        debug!(count = products.len(), "Fetched product listing");

        self.inner
            .cache
            .insert(ListingKey, Arc::clone(&products))
            .await;

        Ok(products)
    }
}

/// `{base}/items`, keeping any path prefix on the base URL.
fn items_url(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("items")
}
