//! Firestore order store.
//!
//! Orders live at `users/{identity}/orders/{checkout_session_id}`, one
//! document per completed checkout, written by the checkout webhook. The
//! storefront only reads them, through the REST `runQuery` endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = FirestoreOrderStore::new(&config.firestore)?;
//! let records = store.fetch_orders(&identity).await?;
//! ```

mod conversions;
pub mod types;

pub use conversions::{convert_order_document, convert_timestamp};

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use modern_shop_core::{Identity, OrderRecord};

use crate::config::FirestoreConfig;
use crate::orders::{OrderStore, StoreError};
use types::{ErrorEnvelope, RunQueryRequest, RunQueryResponseItem};

const USERS_COLLECTION: &str = "users";
const ORDERS_COLLECTION: &str = "orders";
const ORDER_FIELD: &str = conversions::fields::TIMESTAMP;

// =============================================================================
// FirestoreOrderStore
// =============================================================================

/// Client for a customer's order documents in Firestore.
#[derive(Clone)]
pub struct FirestoreOrderStore {
    inner: Arc<FirestoreOrderStoreInner>,
}

struct FirestoreOrderStoreInner {
    client: reqwest::Client,
    documents_url: String,
    access_token: Option<SecretString>,
}

impl FirestoreOrderStore {
    /// Create a new order store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &FirestoreConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(FirestoreOrderStoreInner {
                client,
                documents_url: config.documents_url(),
                access_token: config.access_token.clone(),
            }),
        })
    }

    /// URL of the `runQuery` call scoped to one customer's document.
    fn run_query_url(&self, identity: &Identity) -> String {
        format!(
            "{}/{USERS_COLLECTION}/{}:runQuery",
            self.inner.documents_url,
            urlencoding::encode(identity.as_str())
        )
    }
}

#[async_trait]
impl OrderStore for FirestoreOrderStore {
    #[instrument(skip(self, identity), fields(identity = %identity.redacted()))]
    async fn fetch_orders(&self, identity: &Identity) -> Result<Vec<OrderRecord>, StoreError> {
        let body = RunQueryRequest::newest_first(ORDERS_COLLECTION, ORDER_FIELD);

        let mut request = self.inner.client.post(self.run_query_url(identity)).json(&body);
        if let Some(token) = &self.inner.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&response_text);
            error!(status = %status, message = %message, "Firestore returned non-success status");
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let items: Vec<RunQueryResponseItem> = match serde_json::from_str(&response_text) {
            Ok(items) => items,
            Err(e) => {
                error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Firestore runQuery response"
                );
                return Err(StoreError::Parse(e));
            }
        };

        let records = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(convert_order_document)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "Fetched order records");
        Ok(records)
    }
}

/// Pull the message out of a Google API error body, or fall back to the
/// start of the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| {
            let status = envelope.error.status.unwrap_or_default();
            envelope.error.message.map(|message| {
                if status.is_empty() {
                    message
                } else {
                    format!("{status}: {message}")
                }
            })
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
