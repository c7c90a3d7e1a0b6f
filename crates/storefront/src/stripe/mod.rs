//! Stripe client for checkout session line items.
//!
//! Every order document id is a Stripe Checkout Session id; the items bought
//! in it are only held by Stripe and are read on demand, one page per order.

mod conversions;
pub mod types;

pub use conversions::convert_line_item_list;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use modern_shop_core::{LINE_ITEM_PAGE_SIZE, LineItem, OrderId};

use crate::config::StripeConfig;
use crate::orders::{LineItemError, LineItemProvider};
use types::{ErrorBody, List, StripeLineItem};

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    fn line_items_url(&self, order_id: &OrderId, limit: usize) -> String {
        format!(
            "{}/v1/checkout/sessions/{}/line_items?limit={limit}",
            self.inner.api_base,
            urlencoding::encode(order_id.as_str())
        )
    }
}

#[async_trait]
impl LineItemProvider for StripeClient {
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    async fn fetch_line_items(
        &self,
        order_id: &OrderId,
        page_size: usize,
    ) -> Result<Vec<LineItem>, LineItemError> {
        // Stripe caps list pages at 100
        let limit = page_size.clamp(1, LINE_ITEM_PAGE_SIZE);

        let response = self
            .inner
            .client
            .get(self.line_items_url(order_id, limit))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(LineItemError::RateLimited { retry_after });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LineItemError::NotFound(order_id.to_string()));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&response_text);
            warn!(status = %status, message = %message, "Stripe returned non-success status");
            return Err(LineItemError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let list: List<StripeLineItem> = serde_json::from_str(&response_text)?;
        if list.has_more {
            debug!(limit, "Order has more line items than one page, keeping the first page");
        }

        convert_line_item_list(list)
    }
}

/// Pull the message out of a Stripe error body, or fall back to the start of
/// the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| match (parsed.error.code, parsed.error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (_, None) => parsed.error.kind,
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
