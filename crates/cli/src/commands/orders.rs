//! Order history lookup for one customer.
//!
//! Runs the same aggregation as the profile page, with the identity given on
//! the command line instead of read from a session. Needs the Firestore and
//! Stripe variables the storefront uses; see `modern_shop_storefront::config`.

use std::sync::Arc;

use modern_shop_core::Identity;
use modern_shop_storefront::config::{self, FirestoreConfig, StripeConfig};
use modern_shop_storefront::firestore::FirestoreOrderStore;
use modern_shop_storefront::orders::{ExplicitIdentity, FailurePolicy, OrderAggregator};
use modern_shop_storefront::stripe::StripeClient;

/// Print the order history stored under `email` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the email is not a
/// usable identity, or the order history cannot be assembled.
pub async fn print_history(email: &str, fail_fast: bool) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::parse(email)?;

    let mut settings = config::order_history_from_env()?;
    if fail_fast {
        settings.failure_policy = FailurePolicy::FailFast;
    }

    let store = FirestoreOrderStore::new(&FirestoreConfig::from_env(settings.store_timeout)?)?;
    let line_items = StripeClient::new(&StripeConfig::from_env(settings.provider_timeout)?)?;

    let aggregator = OrderAggregator::new(
        ExplicitIdentity,
        Arc::new(store),
        Arc::new(line_items),
        settings,
    );

    let history = aggregator.get_order_history(&Some(identity)).await?;
    tracing::info!(
        orders = history.orders().len(),
        unavailable = history.failures().len(),
        "Order history assembled"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&history)?);
    }

    Ok(())
}
