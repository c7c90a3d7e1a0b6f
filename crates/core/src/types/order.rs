//! Order records, enriched orders and the order history outcome.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::OrderId;
use super::line_item::LineItem;
use super::timestamp::{StoreTimestamp, TimestampError};

/// A stored snapshot of a completed checkout.
///
/// Written by the checkout webhook (outside this system) and read-only here.
/// The id equals the payments provider's checkout session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Checkout session id.
    pub id: OrderId,
    /// Total charged amount.
    pub amount: Decimal,
    /// Shipping portion of the charge.
    pub amount_shipping: Option<Decimal>,
    /// Product thumbnails, in checkout order.
    pub images: Vec<String>,
    /// Creation time, as read from the store.
    pub timestamp: StoreTimestamp,
}

/// An order record merged with its line items, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    /// Checkout session id.
    pub id: OrderId,
    /// Total charged amount.
    pub amount: Decimal,
    /// Shipping portion of the charge.
    pub amount_shipping: Option<Decimal>,
    /// Product thumbnails, in checkout order.
    pub images: Vec<String>,
    /// Creation time in whole seconds since the Unix epoch.
    pub timestamp: i64,
    /// Purchased items, at most one provider page.
    pub items: Vec<LineItem>,
}

impl EnrichedOrder {
    /// Merge a record with its normalized timestamp and line items.
    #[must_use]
    pub fn from_record(record: OrderRecord, timestamp: i64, items: Vec<LineItem>) -> Self {
        Self {
            id: record.id,
            amount: record.amount,
            amount_shipping: record.amount_shipping,
            images: record.images,
            timestamp,
            items,
        }
    }
}

/// An order that could not be enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFailure {
    /// The order that failed.
    pub order_id: OrderId,
    /// What went wrong.
    pub reason: OrderFailureReason,
}

/// Why a single order could not be enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderFailureReason {
    /// The payments provider did not return the order's line items.
    LineItemsUnavailable {
        /// Provider error description.
        cause: String,
        /// Whether trying again later may succeed.
        retryable: bool,
    },
    /// The stored timestamp could not be normalized.
    InvalidTimestamp {
        /// Normalization error.
        cause: TimestampError,
    },
}

impl std::fmt::Display for OrderFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LineItemsUnavailable { cause, .. } => {
                write!(f, "line items unavailable: {cause}")
            }
            Self::InvalidTimestamp { cause } => write!(f, "invalid timestamp: {cause}"),
        }
    }
}

/// Result of an order history request.
///
/// Signing out and having no orders are normal outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderHistory {
    /// No signed-in customer; the caller should prompt for sign-in.
    Anonymous,
    /// Every order was enriched, newest first. May be empty.
    History {
        /// Enriched orders, newest first.
        orders: Vec<EnrichedOrder>,
    },
    /// Some orders could not be enriched.
    ///
    /// Both lists keep the store's newest-first order.
    PartialFailure {
        /// Orders that were enriched.
        orders: Vec<EnrichedOrder>,
        /// Orders that could not be enriched.
        failures: Vec<OrderFailure>,
    },
}

impl OrderHistory {
    /// Build the outcome for a signed-in customer from merged results.
    #[must_use]
    pub fn from_parts(orders: Vec<EnrichedOrder>, failures: Vec<OrderFailure>) -> Self {
        if failures.is_empty() {
            Self::History { orders }
        } else {
            Self::PartialFailure { orders, failures }
        }
    }

    /// Enriched orders, empty when anonymous.
    #[must_use]
    pub fn orders(&self) -> &[EnrichedOrder] {
        match self {
            Self::Anonymous => &[],
            Self::History { orders } | Self::PartialFailure { orders, .. } => orders,
        }
    }

    /// Orders that could not be enriched.
    #[must_use]
    pub fn failures(&self) -> &[OrderFailure] {
        match self {
            Self::PartialFailure { failures, .. } => failures,
            Self::Anonymous | Self::History { .. } => &[],
        }
    }

    /// Whether the request had no signed-in customer.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
