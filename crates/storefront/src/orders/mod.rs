//! Customer order history.
//!
//! The profile page shows a signed-in customer's past orders. Three sources
//! feed it, each at its own pace:
//!
//! - the session, which says who is signed in ([`SessionResolver`])
//! - the order store, which holds one document per completed checkout,
//!   newest first ([`OrderStore`], implemented by
//!   [`FirestoreOrderStore`](crate::firestore::FirestoreOrderStore))
//! - the payments provider, which holds each checkout's line items
//!   ([`LineItemProvider`], implemented by
//!   [`StripeClient`](crate::stripe::StripeClient))
//!
//! [`OrderAggregator`] ties them together. Anonymous visitors short-circuit
//! before any store or provider call; line items are fetched concurrently and
//! merged back by position, so the result keeps the store's newest-first order
//! no matter which fetch finishes first.
//!
//! # Example
//!
//! ```rust,ignore
//! let aggregator = OrderAggregator::new(
//!     SessionCustomerResolver,
//!     Arc::new(FirestoreOrderStore::new(&config.firestore)?),
//!     Arc::new(StripeClient::new(&config.stripe)?),
//!     config.order_history.clone(),
//! );
//!
//! match aggregator.get_order_history(&session).await? {
//!     OrderHistory::Anonymous => { /* prompt for sign-in */ }
//!     OrderHistory::History { orders } => { /* render */ }
//!     OrderHistory::PartialFailure { orders, failures } => { /* render + placeholders */ }
//! }
//! ```

mod aggregator;
pub mod error;
mod session;

pub use aggregator::{FailurePolicy, OrderAggregator, OrderHistorySettings, ParseFailurePolicyError};
pub use error::{LineItemError, OrderHistoryError, StoreError};
pub use session::{ExplicitIdentity, SessionCustomerResolver};

use async_trait::async_trait;

use modern_shop_core::{Identity, LineItem, OrderId, OrderRecord};

/// Resolves the signed-in customer for a request.
///
/// Resolution never fails: a missing or unreadable session is an anonymous
/// visitor.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Per-request context the identity is read from.
    type Context: Send + Sync;

    /// Return the signed-in identity, or `None` for anonymous visitors.
    async fn resolve(&self, ctx: &Self::Context) -> Option<Identity>;
}

/// Read access to stored order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch every order record owned by `identity`, newest first.
    ///
    /// A customer without orders yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached or answers with
    /// documents that do not match the order schema.
    async fn fetch_orders(&self, identity: &Identity) -> Result<Vec<OrderRecord>, StoreError>;
}

/// Read access to checkout line items held by the payments provider.
#[async_trait]
pub trait LineItemProvider: Send + Sync {
    /// Fetch a single page of at most `page_size` line items for an order, in
    /// provider order.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError`] if the provider rejects the order id or the
    /// request fails. An error is never reported as an empty list.
    async fn fetch_line_items(
        &self,
        order_id: &OrderId,
        page_size: usize,
    ) -> Result<Vec<LineItem>, LineItemError>;
}
