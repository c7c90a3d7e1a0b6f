//! Session-related types.
//!
//! Types stored in the session for authentication state. Sign-in itself is
//! handled by the identity provider; this crate only reads what it stored.

use serde::{Deserialize, Serialize};

use modern_shop_core::{Identity, IdentityError};

/// Session-stored customer profile.
///
/// Minimal data stored in the session to identify and greet the signed-in
/// customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's email address. Keys the customer's orders in the store.
    pub email: String,
    /// Display name from the identity provider.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL from the identity provider.
    #[serde(default)]
    pub image: Option<String>,
}

impl CurrentCustomer {
    /// The identity this customer's orders are stored under.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored email is not a usable identity.
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        Identity::parse(&self.email)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
