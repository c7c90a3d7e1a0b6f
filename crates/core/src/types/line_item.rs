//! Checkout line items as reported by the payments provider.

use serde::{Deserialize, Serialize};

use super::id::LineItemId;

/// Maximum number of line items fetched per order.
///
/// Line items are read as a single page; orders with more items are truncated
/// to this many rather than paginated.
pub const LINE_ITEM_PAGE_SIZE: usize = 100;

/// One purchased SKU within a checkout session.
///
/// Owned by the payments provider. Amounts are in the currency's minor unit
/// (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Provider line item id.
    pub id: LineItemId,
    /// Product description shown at checkout.
    pub description: String,
    /// Quantity purchased, if the provider recorded one.
    pub quantity: Option<u64>,
    /// Total before discounts and taxes.
    pub amount_subtotal: i64,
    /// Total after discounts and taxes.
    pub amount_total: i64,
    /// Three-letter ISO currency code, lowercase.
    pub currency: String,
    /// Price the item was sold at.
    pub price: Option<LineItemPrice>,
}

/// Price attached to a [`LineItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPrice {
    /// Provider price id.
    pub id: String,
    /// Unit amount in minor units. Absent for custom/tiered pricing.
    pub unit_amount: Option<i64>,
    /// Provider product id.
    pub product: Option<String>,
}
