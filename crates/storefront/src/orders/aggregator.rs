//! Order history aggregation: resolve, read, enrich, merge.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, info_span, instrument, warn};

use modern_shop_core::{
    EnrichedOrder, Identity, LINE_ITEM_PAGE_SIZE, LineItem, OrderFailure, OrderFailureReason,
    OrderHistory, OrderId, OrderRecord, TimestampError,
};

use super::{
    LineItemError, LineItemProvider, OrderHistoryError, OrderStore, SessionResolver, StoreError,
};

/// How a failed order affects the rest of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep the orders that succeeded and report the rest per order.
    #[default]
    Isolate,
    /// Abort the whole request on the first failed order.
    FailFast,
}

/// Error parsing a [`FailurePolicy`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown failure policy '{0}' (expected 'isolate' or 'fail-fast')")]
pub struct ParseFailurePolicyError(String);

impl FromStr for FailurePolicy {
    type Err = ParseFailurePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" => Ok(Self::Isolate),
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => Err(ParseFailurePolicyError(other.to_string())),
        }
    }
}

/// Tuning for [`OrderAggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHistorySettings {
    /// Timeout for the order store query.
    pub store_timeout: Duration,
    /// Timeout for each line item request, counted once it is allowed to run.
    pub provider_timeout: Duration,
    /// In-flight line item requests allowed when the history is large.
    pub max_concurrency: usize,
    /// Histories up to this many orders fetch every order at once.
    pub unbounded_up_to: usize,
    /// Line items requested per order.
    pub page_size: usize,
    /// What a failed order does to the rest of the history.
    pub failure_policy: FailurePolicy,
}

impl Default for OrderHistorySettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            provider_timeout: Duration::from_secs(5),
            max_concurrency: 10,
            unbounded_up_to: 20,
            page_size: LINE_ITEM_PAGE_SIZE,
            failure_policy: FailurePolicy::Isolate,
        }
    }
}

impl OrderHistorySettings {
    /// In-flight line item requests allowed for a history of `orders` orders.
    #[must_use]
    pub fn concurrency_for(&self, orders: usize) -> usize {
        if orders <= self.unbounded_up_to {
            orders.max(1)
        } else {
            self.max_concurrency.max(1)
        }
    }
}

type FetchResult = Result<Vec<LineItem>, LineItemError>;

/// Builds a customer's order history from the session, the order store and
/// the payments provider.
///
/// Stateless between calls: the store and provider handles are shared,
/// read-only and constructed once at startup.
pub struct OrderAggregator<R> {
    resolver: R,
    store: Arc<dyn OrderStore>,
    line_items: Arc<dyn LineItemProvider>,
    settings: OrderHistorySettings,
}

impl<R: SessionResolver> OrderAggregator<R> {
    /// Create an aggregator over the given collaborators.
    #[must_use]
    pub fn new(
        resolver: R,
        store: Arc<dyn OrderStore>,
        line_items: Arc<dyn LineItemProvider>,
        settings: OrderHistorySettings,
    ) -> Self {
        Self {
            resolver,
            store,
            line_items,
            settings,
        }
    }

    /// Get the settings this aggregator runs with.
    #[must_use]
    pub const fn settings(&self) -> &OrderHistorySettings {
        &self.settings
    }

    /// Get the order history for the customer signed in on `ctx`.
    ///
    /// Anonymous visitors get [`OrderHistory::Anonymous`] without any store or
    /// provider call. Dropping the returned future cancels every in-flight
    /// line item request and discards partial results.
    ///
    /// # Errors
    ///
    /// Returns [`OrderHistoryError::StoreUnavailable`] if the order store
    /// cannot be read. Under [`FailurePolicy::FailFast`], also returns the
    /// first per-order failure.
    pub async fn get_order_history(
        &self,
        ctx: &R::Context,
    ) -> Result<OrderHistory, OrderHistoryError> {
        let Some(identity) = self.resolver.resolve(ctx).await else {
            debug!("No signed-in customer, skipping order lookup");
            return Ok(OrderHistory::Anonymous);
        };

        self.history_for(&identity).await
    }

    /// Get the order history for a known identity.
    ///
    /// # Errors
    ///
    /// See [`get_order_history`](Self::get_order_history).
    #[instrument(skip(self, identity), fields(identity = %identity.redacted(), orders = tracing::field::Empty, failures = tracing::field::Empty))]
    pub async fn history_for(&self, identity: &Identity) -> Result<OrderHistory, OrderHistoryError> {
        let records = self.read_orders(identity).await?;
        Span::current().record("orders", records.len());

        if records.is_empty() {
            return Ok(OrderHistory::History { orders: Vec::new() });
        }

        let timestamps: Vec<Result<i64, TimestampError>> = records
            .iter()
            .map(|record| record.timestamp.to_epoch_seconds())
            .collect();

        if self.settings.failure_policy == FailurePolicy::FailFast
            && let Some((record, Err(cause))) = records
                .iter()
                .zip(&timestamps)
                .find(|(_, timestamp)| timestamp.is_err())
        {
            return Err(OrderHistoryError::InvalidTimestamp {
                order_id: record.id.clone(),
                cause: cause.clone(),
            });
        }

        // Orders whose timestamp is already unusable are not worth a provider call.
        let jobs: Vec<(usize, OrderId)> = records
            .iter()
            .zip(&timestamps)
            .enumerate()
            .filter(|(_, (_, timestamp))| timestamp.is_ok())
            .map(|(slot, (record, _))| (slot, record.id.clone()))
            .collect();

        let fetched = self.fetch_line_items(&records, jobs).await?;
        let history = self.merge(records, timestamps, fetched);

        Span::current().record("failures", history.failures().len());
        Ok(history)
    }

    /// Query the store under the store timeout.
    async fn read_orders(&self, identity: &Identity) -> Result<Vec<OrderRecord>, OrderHistoryError> {
        let timeout = self.settings.store_timeout;

        match tokio::time::timeout(timeout, self.store.fetch_orders(identity)).await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) => {
                warn!(error = %e, "Order store query failed");
                Err(OrderHistoryError::StoreUnavailable(e))
            }
            Err(_) => {
                warn!(?timeout, "Order store query timed out");
                Err(OrderHistoryError::StoreUnavailable(StoreError::Timeout(
                    timeout,
                )))
            }
        }
    }

    /// Fetch line items for every job concurrently.
    ///
    /// Returns one slot per record, indexed by store position. Slots of
    /// records that were not fetched, or whose task died, stay `None`.
    async fn fetch_line_items(
        &self,
        records: &[OrderRecord],
        jobs: Vec<(usize, OrderId)>,
    ) -> Result<Vec<Option<FetchResult>>, OrderHistoryError> {
        let mut slots: Vec<Option<FetchResult>> = records.iter().map(|_| None).collect();
        let scheduled: Vec<usize> = jobs.iter().map(|(slot, _)| *slot).collect();

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency_for(jobs.len())));
        let mut tasks = JoinSet::new();

        for (slot, order_id) in jobs {
            let provider = Arc::clone(&self.line_items);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.settings.provider_timeout;
            let page_size = self.settings.page_size;
            let span = info_span!("line_items", order_id = %order_id);

            tasks.spawn(
                async move {
                    let result =
                        fetch_one(provider.as_ref(), &semaphore, &order_id, page_size, timeout)
                            .await;
                    (slot, result)
                }
                .instrument(span),
            );
        }

        // Dropping `tasks` on an early return aborts whatever is still running.
        while let Some(joined) = tasks.join_next().await {
            let (slot, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "Line item task ended without a result");
                    continue;
                }
            };

            if self.settings.failure_policy == FailurePolicy::FailFast
                && let Err(cause) = result
            {
                return Err(OrderHistoryError::LineItemFetchFailed {
                    order_id: order_id_at(records, slot),
                    cause,
                });
            }

            if let Some(entry) = slots.get_mut(slot) {
                *entry = Some(result);
            }
        }

        if self.settings.failure_policy == FailurePolicy::FailFast
            && let Some(slot) = scheduled
                .into_iter()
                .find(|slot| slots.get(*slot).is_some_and(Option::is_none))
        {
            return Err(OrderHistoryError::LineItemFetchFailed {
                order_id: order_id_at(records, slot),
                cause: lost_task(),
            });
        }

        Ok(slots)
    }

    /// Join records with their timestamps and line items, in store order.
    fn merge(
        &self,
        records: Vec<OrderRecord>,
        timestamps: Vec<Result<i64, TimestampError>>,
        fetched: Vec<Option<FetchResult>>,
    ) -> OrderHistory {
        let page_size = self.settings.page_size;
        let mut orders = Vec::with_capacity(records.len());
        let mut failures = Vec::new();

        for ((record, timestamp), items) in records.into_iter().zip(timestamps).zip(fetched) {
            let timestamp = match timestamp {
                Ok(timestamp) => timestamp,
                Err(cause) => {
                    warn!(order_id = %record.id, error = %cause, "Order has an invalid timestamp");
                    failures.push(OrderFailure {
                        order_id: record.id,
                        reason: OrderFailureReason::InvalidTimestamp { cause },
                    });
                    continue;
                }
            };

            match items.unwrap_or_else(|| Err(lost_task())) {
                Ok(mut items) => {
                    if items.len() > page_size {
                        debug!(
                            order_id = %record.id,
                            returned = items.len(),
                            page_size,
                            "Truncating line items to one page"
                        );
                        items.truncate(page_size);
                    }
                    orders.push(EnrichedOrder::from_record(record, timestamp, items));
                }
                Err(cause) => {
                    warn!(order_id = %record.id, error = %cause, "Line items unavailable for order");
                    failures.push(OrderFailure {
                        order_id: record.id,
                        reason: OrderFailureReason::LineItemsUnavailable {
                            retryable: cause.is_retryable(),
                            cause: cause.to_string(),
                        },
                    });
                }
            }
        }

        OrderHistory::from_parts(orders, failures)
    }
}

/// Fetch one order's line items once a concurrency permit is available.
async fn fetch_one(
    provider: &dyn LineItemProvider,
    semaphore: &Semaphore,
    order_id: &OrderId,
    page_size: usize,
    timeout: Duration,
) -> FetchResult {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| LineItemError::Task(e.to_string()))?;

    match tokio::time::timeout(timeout, provider.fetch_line_items(order_id, page_size)).await {
        Ok(result) => result,
        Err(_) => Err(LineItemError::Timeout(timeout)),
    }
}

fn order_id_at(records: &[OrderRecord], slot: usize) -> OrderId {
    records
        .get(slot)
        .map_or_else(|| OrderId::new(format!("#{slot}")), |record| record.id.clone())
}

fn lost_task() -> LineItemError {
    LineItemError::Task("task ended without a result".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use modern_shop_core::{LineItemId, StoreTimestamp};
    use rust_decimal::Decimal;

    use super::*;
    use crate::orders::ExplicitIdentity;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeStore {
        records: Vec<OrderRecord>,
        unavailable: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderStore for FakeStore {
        async fn fetch_orders(&self, _identity: &Identity) -> Result<Vec<OrderRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.unavailable {
                return Err(StoreError::Status {
                    status: 503,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(self.records.clone())
        }
    }

    enum Reply {
        Items(usize),
        NotFound,
        Hang,
    }

    #[derive(Default)]
    struct FakeProvider {
        replies: HashMap<String, Reply>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        completed: AtomicUsize,
        requested_page_sizes: Mutex<Vec<usize>>,
    }

    impl FakeProvider {
        fn reply(mut self, order_id: &str, reply: Reply) -> Self {
            self.replies.insert(order_id.to_string(), reply);
            self
        }

        fn delay(mut self, order_id: &str, delay: Duration) -> Self {
            self.delays.insert(order_id.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl LineItemProvider for FakeProvider {
        async fn fetch_line_items(
            &self,
            order_id: &OrderId,
            page_size: usize,
        ) -> Result<Vec<LineItem>, LineItemError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested_page_sizes.lock().unwrap().push(page_size);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self
                .delays
                .get(order_id.as_str())
                .copied()
                .unwrap_or(Duration::from_millis(5));
            tokio::time::sleep(delay).await;

            let result = match self.replies.get(order_id.as_str()) {
                Some(Reply::NotFound) => Err(LineItemError::NotFound(order_id.to_string())),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
                Some(Reply::Items(count)) => Ok(items_for(order_id, *count)),
                None => Ok(items_for(order_id, 1)),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            result
        }
    }

    fn items_for(order_id: &OrderId, count: usize) -> Vec<LineItem> {
        (0..count)
            .map(|i| LineItem {
                id: LineItemId::new(format!("li_{order_id}_{i}")),
                description: format!("Item {i}"),
                quantity: Some(1),
                amount_subtotal: 1000,
                amount_total: 1000,
                currency: "usd".to_string(),
                price: None,
            })
            .collect()
    }

    fn record(id: &str, seconds: i64) -> OrderRecord {
        OrderRecord {
            id: OrderId::new(id),
            amount: Decimal::new(2500, 2),
            amount_shipping: None,
            images: vec![format!("https://cdn.example.com/{id}.png")],
            timestamp: StoreTimestamp::Parts { seconds, nanos: 0 },
        }
    }

    fn newest_first(ids: &[&str]) -> Vec<OrderRecord> {
        let newest = 1_700_000_000;
        ids.iter()
            .zip(0_i64..)
            .map(|(id, age)| record(id, newest - age * 3600))
            .collect()
    }

    fn aggregator(
        store: &Arc<FakeStore>,
        provider: &Arc<FakeProvider>,
        settings: OrderHistorySettings,
    ) -> OrderAggregator<ExplicitIdentity> {
        let store: Arc<dyn OrderStore> = store.clone();
        let provider: Arc<dyn LineItemProvider> = provider.clone();
        OrderAggregator::new(ExplicitIdentity, store, provider, settings)
    }

    fn signed_in() -> Option<Identity> {
        Some(Identity::parse("shopper@example.com").unwrap())
    }

    fn ids(orders: &[EnrichedOrder]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_anonymous_makes_no_calls() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["cs_a"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default());
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&None).await.unwrap();

        assert_eq!(history, OrderHistory::Anonymous);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_orders_is_empty_history() {
        let store = Arc::new(FakeStore::default());
        let provider = Arc::new(FakeProvider::default());
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(history, OrderHistory::History { orders: Vec::new() });
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_order_survives_reversed_latencies() {
        let order_ids = ["cs_1", "cs_2", "cs_3", "cs_4", "cs_5"];
        let store = Arc::new(FakeStore {
            records: newest_first(&order_ids),
            ..FakeStore::default()
        });
        // The newest order answers last, the oldest first.
        let provider = order_ids
            .iter()
            .zip((1_u64..).map(|n| 60 - n * 10))
            .fold(FakeProvider::default(), |provider, (id, ms)| {
                provider.delay(id, Duration::from_millis(ms))
            });
        let provider = Arc::new(provider);
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(ids(history.orders()), order_ids);
        assert!(history.failures().is_empty());
        assert_eq!(history.orders()[0].timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_structurally_equal() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["cs_a", "cs_b"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default().reply("cs_b", Reply::Items(3)));
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let first = aggregator.get_order_history(&signed_in()).await.unwrap();
        let second = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_line_items_truncated_to_page_size() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["cs_big"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default().reply("cs_big", Reply::Items(150)));
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(history.orders()[0].items.len(), 100);
        assert_eq!(*provider.requested_page_sizes.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_failed_order_is_isolated() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["A", "B", "C"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default().reply("B", Reply::NotFound));
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        let OrderHistory::PartialFailure { orders, failures } = history else {
            panic!("expected partial failure, got {history:?}");
        };
        assert_eq!(ids(&orders), ["A", "C"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].order_id.as_str(), "B");
        assert!(matches!(
            failures[0].reason,
            OrderFailureReason::LineItemsUnavailable {
                retryable: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_order_fails_fast() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["A", "B", "C"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default().reply("B", Reply::NotFound));
        let settings = OrderHistorySettings {
            failure_policy: FailurePolicy::FailFast,
            ..OrderHistorySettings::default()
        };
        let aggregator = aggregator(&store, &provider, settings);

        let err = aggregator.get_order_history(&signed_in()).await.unwrap_err();

        match err {
            OrderHistoryError::LineItemFetchFailed { order_id, cause } => {
                assert_eq!(order_id.as_str(), "B");
                assert!(matches!(cause, LineItemError::NotFound(_)));
            }
            other => panic!("expected LineItemFetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hung_provider_call_times_out_per_order() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["A", "B"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default().reply("A", Reply::Hang));
        let settings = OrderHistorySettings {
            provider_timeout: Duration::from_millis(50),
            ..OrderHistorySettings::default()
        };
        let aggregator = aggregator(&store, &provider, settings);

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(ids(history.orders()), ["B"]);
        assert_eq!(history.failures()[0].order_id.as_str(), "A");
        assert!(matches!(
            history.failures()[0].reason,
            OrderFailureReason::LineItemsUnavailable {
                retryable: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_store_unavailable() {
        let store = Arc::new(FakeStore {
            unavailable: true,
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default());
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let err = aggregator.get_order_history(&signed_in()).await.unwrap_err();

        assert!(matches!(err, OrderHistoryError::StoreUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_timeout_is_store_unavailable() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["A"]),
            delay: Some(Duration::from_secs(3600)),
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default());
        let settings = OrderHistorySettings {
            store_timeout: Duration::from_millis(50),
            ..OrderHistorySettings::default()
        };
        let aggregator = aggregator(&store, &provider, settings);

        let err = aggregator.get_order_history(&signed_in()).await.unwrap_err();

        assert!(matches!(
            err,
            OrderHistoryError::StoreUnavailable(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_timestamp_is_isolated_without_provider_call() {
        let mut records = newest_first(&["A", "B"]);
        records[0].timestamp = StoreTimestamp::Missing;
        let store = Arc::new(FakeStore {
            records,
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default());
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(ids(history.orders()), ["B"]);
        assert_eq!(
            history.failures()[0].reason,
            OrderFailureReason::InvalidTimestamp {
                cause: TimestampError::Missing
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_timestamp_fails_fast_before_fan_out() {
        let mut records = newest_first(&["A", "B"]);
        records[1].timestamp = StoreTimestamp::Rfc3339("not a time".to_string());
        let store = Arc::new(FakeStore {
            records,
            ..FakeStore::default()
        });
        let provider = Arc::new(FakeProvider::default());
        let settings = OrderHistorySettings {
            failure_policy: FailurePolicy::FailFast,
            ..OrderHistorySettings::default()
        };
        let aggregator = aggregator(&store, &provider, settings);

        let err = aggregator.get_order_history(&signed_in()).await.unwrap_err();

        assert!(matches!(
            err,
            OrderHistoryError::InvalidTimestamp { ref order_id, .. } if order_id.as_str() == "B"
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_large_history_is_bounded() {
        let order_ids: Vec<String> = (0..30).map(|i| format!("cs_{i:02}")).collect();
        let refs: Vec<&str> = order_ids.iter().map(String::as_str).collect();
        let store = Arc::new(FakeStore {
            records: newest_first(&refs),
            ..FakeStore::default()
        });
        let provider = refs.iter().fold(FakeProvider::default(), |provider, id| {
            provider.delay(id, Duration::from_millis(20))
        });
        let provider = Arc::new(provider);
        let settings = OrderHistorySettings {
            max_concurrency: 4,
            ..OrderHistorySettings::default()
        };
        let aggregator = aggregator(&store, &provider, settings);

        let history = aggregator.get_order_history(&signed_in()).await.unwrap();

        assert_eq!(ids(history.orders()), refs);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_in_flight_fetches() {
        let store = Arc::new(FakeStore {
            records: newest_first(&["A", "B", "C"]),
            ..FakeStore::default()
        });
        let provider = Arc::new(
            FakeProvider::default()
                .delay("A", Duration::from_millis(150))
                .delay("B", Duration::from_millis(150))
                .delay("C", Duration::from_millis(150)),
        );
        let aggregator = aggregator(&store, &provider, OrderHistorySettings::default());

        let identity = signed_in();
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            aggregator.get_order_history(&identity),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        // Well past the provider delay: a leaked task would have finished by now.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(provider.completed.load(Ordering::SeqCst), 0);
        assert_eq!(provider.in_flight.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrency_for() {
        let settings = OrderHistorySettings::default();
        assert_eq!(settings.concurrency_for(0), 1);
        assert_eq!(settings.concurrency_for(7), 7);
        assert_eq!(settings.concurrency_for(20), 20);
        assert_eq!(settings.concurrency_for(21), 10);
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("isolate".parse::<FailurePolicy>().unwrap(), FailurePolicy::Isolate);
        assert_eq!(" Fail-Fast ".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailFast);
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }
}
