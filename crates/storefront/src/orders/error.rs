//! Errors raised while assembling a customer's order history.

use std::time::Duration;

use thiserror::Error;

use modern_shop_core::{OrderId, TimestampError};

/// Errors from the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The query did not complete within the configured timeout.
    #[error("store query timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A stored document did not match the order schema.
    #[error("invalid order document {document}: {reason}")]
    InvalidDocument {
        /// Full document name.
        document: String,
        /// Which field failed and why.
        reason: String,
    },
}

impl StoreError {
    /// Whether trying again later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::InvalidDocument { .. } => false,
        }
    }
}

/// Errors from the payments provider when listing line items.
#[derive(Debug, Error)]
pub enum LineItemError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider does not know the checkout session.
    #[error("checkout session not found: {0}")]
    NotFound(String),

    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: u64,
    },

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The call did not complete within the configured timeout.
    #[error("line item request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but did not match the line item schema.
    #[error("invalid line item payload: {0}")]
    InvalidPayload(String),

    /// The fetch task ended without producing a result.
    #[error("line item task failed: {0}")]
    Task(String),
}

impl LineItemError {
    /// Whether trying again later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::RateLimited { .. } | Self::Timeout(_) | Self::Task(_) => {
                true
            }
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Parse(_) | Self::InvalidPayload(_) => false,
        }
    }
}

/// Errors that abort an order history request.
///
/// A missing identity or an empty history are outcomes, not errors; see
/// [`OrderHistory`](modern_shop_core::OrderHistory).
#[derive(Debug, Error)]
pub enum OrderHistoryError {
    /// The order store could not be read. No history can be shown.
    #[error("order store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Line items for one order could not be fetched (fail-fast policy).
    #[error("line items for order {order_id} could not be fetched: {cause}")]
    LineItemFetchFailed {
        /// The order whose line items failed.
        order_id: OrderId,
        /// Provider error.
        #[source]
        cause: LineItemError,
    },

    /// One order's timestamp could not be normalized (fail-fast policy).
    #[error("order {order_id} has an invalid timestamp: {cause}")]
    InvalidTimestamp {
        /// The order with the bad timestamp.
        order_id: OrderId,
        /// Normalization error.
        #[source]
        cause: TimestampError,
    },
}

impl OrderHistoryError {
    /// Whether trying the whole request again later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable(err) => err.is_retryable(),
            Self::LineItemFetchFailed { cause, .. } => cause.is_retryable(),
            Self::InvalidTimestamp { .. } => false,
        }
    }

    /// The order the error is about, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::StoreUnavailable(_) => None,
            Self::LineItemFetchFailed { order_id, .. } | Self::InvalidTimestamp { order_id, .. } => {
                Some(order_id)
            }
        }
    }
}
