//! Session resolvers.

use async_trait::async_trait;
use tower_sessions::Session;
use tracing::{debug, warn};

use modern_shop_core::Identity;

use super::SessionResolver;
use crate::models::{CurrentCustomer, session_keys};

/// Resolves the signed-in customer from a `tower-sessions` session.
///
/// Reads the [`CurrentCustomer`] stored under
/// [`CURRENT_CUSTOMER`](session_keys::CURRENT_CUSTOMER). Session store errors
/// and unusable identities are logged and treated as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCustomerResolver;

#[async_trait]
impl SessionResolver for SessionCustomerResolver {
    type Context = Session;

    async fn resolve(&self, session: &Session) -> Option<Identity> {
        let customer = match session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
        {
            Ok(Some(customer)) => customer,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read customer from session");
                return None;
            }
        };

        match customer.identity() {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(error = %e, "Session customer has no usable identity");
                None
            }
        }
    }
}

/// Resolver for callers that already know the identity (CLI, jobs).
///
/// The context is the identity itself; `None` is anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitIdentity;

#[async_trait]
impl SessionResolver for ExplicitIdentity {
    type Context = Option<Identity>;

    async fn resolve(&self, identity: &Option<Identity>) -> Option<Identity> {
        identity.clone()
    }
}
