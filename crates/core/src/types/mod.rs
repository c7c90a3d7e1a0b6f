//! Core types for Modern Shop.
//!
//! This module provides type-safe wrappers for the order history domain.

pub mod id;
pub mod identity;
pub mod line_item;
pub mod order;
pub mod timestamp;

pub use id::*;
pub use identity::{Identity, IdentityError};
pub use line_item::{LINE_ITEM_PAGE_SIZE, LineItem, LineItemPrice};
pub use order::{EnrichedOrder, OrderFailure, OrderFailureReason, OrderHistory, OrderRecord};
pub use timestamp::{StoreTimestamp, TimestampError};
