//! Modern Shop Core - Shared domain types.
//!
//! This crate provides the types shared by the Modern Shop components:
//! - `storefront` - Public storefront server (catalog, profile order history)
//! - `cli` - Command-line tools for migrations and support lookups
//!
//! # Architecture
//!
//! The core crate contains only types and pure conversions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Identity, order records, line items, timestamps and the
//!   order history outcome

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
