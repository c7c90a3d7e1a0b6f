//! Test harness for driving the storefront router end to end.
//!
//! The real router, middleware and session layer run in-process; sessions
//! live in a `MemoryStore`, and Firestore, Stripe and the catalog are
//! replaced with in-memory fakes that count their calls. Nothing listens on a
//! socket and no external service is needed.
//!
//! ```rust,ignore
//! let app = TestApp::new(store, line_items);
//! let cookie = app.sign_in("shopper@example.com").await;
//! let response = app.get("/api/orders", Some(&cookie)).await;
//! assert_eq!(response.json()["status"], "ok");
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};
use url::Url;

use modern_shop_core::{
    Identity, LineItem, LineItemId, LineItemPrice, OrderId, OrderRecord, StoreTimestamp,
};
use modern_shop_storefront::catalog::{CatalogError, Product, ProductSource};
use modern_shop_storefront::config::{CatalogConfig, FirestoreConfig, StorefrontConfig, StripeConfig};
use modern_shop_storefront::middleware::set_current_customer;
use modern_shop_storefront::models::CurrentCustomer;
use modern_shop_storefront::orders::{
    LineItemError, LineItemProvider, OrderAggregator, OrderHistorySettings, OrderStore,
    SessionCustomerResolver, StoreError,
};
use modern_shop_storefront::state::AppState;

/// Path of the sign-in route mounted only in tests.
pub const SIGN_IN_PATH: &str = "/test/sign-in";

// =============================================================================
// Fixtures
// =============================================================================

/// An order record created at `seconds` past the epoch.
#[must_use]
pub fn order(id: &str, seconds: i64) -> OrderRecord {
    OrderRecord {
        id: OrderId::new(id),
        amount: Decimal::new(4999, 2),
        amount_shipping: Some(Decimal::new(500, 2)),
        images: vec![format!("https://cdn.example.com/{id}.png")],
        timestamp: StoreTimestamp::Parts { seconds, nanos: 0 },
    }
}

/// `count` line items for an order, numbered from 1.
#[must_use]
pub fn line_items(order_id: &str, count: usize) -> Vec<LineItem> {
    (1..=count)
        .map(|n| LineItem {
            id: LineItemId::new(format!("li_{order_id}_{n}")),
            description: format!("Item {n}"),
            quantity: Some(1),
            amount_subtotal: 1000,
            amount_total: 1000,
            currency: "usd".to_string(),
            price: Some(LineItemPrice {
                id: format!("price_{n}"),
                unit_amount: Some(1000),
                product: Some(format!("prod_{n}")),
            }),
        })
        .collect()
}

/// A catalog product.
#[must_use]
pub fn product(id: &str, title: &str) -> Product {
    Product {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        price: Decimal::new(2450, 2),
        image: None,
        category: Some("bags".to_string()),
    }
}

// =============================================================================
// Fakes
// =============================================================================

/// In-memory order store keyed by identity.
#[derive(Default)]
pub struct FakeOrderStore {
    orders: HashMap<String, Vec<OrderRecord>>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl FakeOrderStore {
    /// Store `records` (newest first) under `email`.
    #[must_use]
    pub fn with_orders(mut self, email: &str, records: Vec<OrderRecord>) -> Self {
        self.orders.insert(email.to_string(), records);
        self
    }

    /// A store that answers every query with HTTP 503.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of queries received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for FakeOrderStore {
    async fn fetch_orders(&self, identity: &Identity) -> Result<Vec<OrderRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StoreError::Status {
                status: 503,
                message: "UNAVAILABLE: backend down".to_string(),
            });
        }
        Ok(self.orders.get(identity.as_str()).cloned().unwrap_or_default())
    }
}

/// In-memory line item provider with per-order latency.
#[derive(Default)]
pub struct FakeLineItems {
    replies: HashMap<String, (Duration, Option<Vec<LineItem>>)>,
    calls: AtomicUsize,
}

impl FakeLineItems {
    /// Answer `order_id` with `items` after `delay`.
    #[must_use]
    pub fn with_items(mut self, order_id: &str, delay: Duration, items: Vec<LineItem>) -> Self {
        self.replies.insert(order_id.to_string(), (delay, Some(items)));
        self
    }

    /// Answer `order_id` with HTTP 500.
    #[must_use]
    pub fn failing(mut self, order_id: &str) -> Self {
        self.replies.insert(order_id.to_string(), (Duration::ZERO, None));
        self
    }

    /// Number of requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineItemProvider for FakeLineItems {
    async fn fetch_line_items(
        &self,
        order_id: &OrderId,
        page_size: usize,
    ) -> Result<Vec<LineItem>, LineItemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(order_id.as_str()) {
            Some((delay, Some(items))) => {
                tokio::time::sleep(*delay).await;
                Ok(items.iter().take(page_size).cloned().collect())
            }
            Some((_, None)) => Err(LineItemError::Status {
                status: 500,
                message: "api_error".to_string(),
            }),
            None => Err(LineItemError::NotFound(order_id.to_string())),
        }
    }
}

/// In-memory catalog. `None` fails every listing.
pub struct FakeCatalog(pub Option<Vec<Product>>);

#[async_trait]
impl ProductSource for FakeCatalog {
    async fn list_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        self.0
            .clone()
            .map(Arc::new)
            .ok_or(CatalogError::Status(503))
    }
}

// =============================================================================
// TestApp
// =============================================================================

/// Storefront configuration pointing at unroutable upstreams.
#[must_use]
pub fn test_config(settings: OrderHistorySettings) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://modern_shop@127.0.0.1:1/unreachable"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        request_timeout: Duration::from_secs(10),
        firestore: FirestoreConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            project_id: "modern-shop-test".to_string(),
            database_id: "(default)".to_string(),
            access_token: None,
            timeout: settings.store_timeout,
        },
        stripe: StripeConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            secret_key: SecretString::from("sk_test_51Hq8ZpLk3vR9mW2nB7cX4dF6gJ0tY"),
            timeout: settings.provider_timeout,
        },
        catalog: CatalogConfig {
            api_url: Url::parse("http://127.0.0.1:1").unwrap(),
            cache_ttl: Duration::from_secs(300),
        },
        order_history: settings,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A response with its body collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Body as text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The storefront router wired to fakes.
pub struct TestApp {
    router: Router,
    pub store: Arc<FakeOrderStore>,
    pub line_items: Arc<FakeLineItems>,
}

impl TestApp {
    /// App with default order history settings and an empty catalog.
    #[must_use]
    pub fn new(store: FakeOrderStore, line_items: FakeLineItems) -> Self {
        Self::with(
            store,
            line_items,
            FakeCatalog(Some(Vec::new())),
            OrderHistorySettings::default(),
        )
    }

    /// App with explicit catalog and settings.
    #[must_use]
    pub fn with(
        store: FakeOrderStore,
        line_items: FakeLineItems,
        catalog: FakeCatalog,
        settings: OrderHistorySettings,
    ) -> Self {
        Self::with_config(store, line_items, catalog, test_config(settings))
    }

    /// App with a full configuration, e.g. one built from [`test_config`]
    /// and then adjusted.
    #[must_use]
    pub fn with_config(
        store: FakeOrderStore,
        line_items: FakeLineItems,
        catalog: FakeCatalog,
        config: StorefrontConfig,
    ) -> Self {
        let store = Arc::new(store);
        let line_items = Arc::new(line_items);
        let settings = config.order_history.clone();

        // Never connects unless the readiness check runs
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://modern_shop@127.0.0.1:1/unreachable")
            .expect("lazy pool");

        let aggregator = OrderAggregator::new(
            SessionCustomerResolver,
            Arc::clone(&store) as Arc<dyn OrderStore>,
            Arc::clone(&line_items) as Arc<dyn LineItemProvider>,
            settings,
        );
        let state = AppState::from_parts(config, pool, aggregator, Arc::new(catalog));

        let routes = modern_shop_storefront::routes::routes().route(SIGN_IN_PATH, post(sign_in));
        let router = modern_shop_storefront::app(routes, state, MemoryStore::default());

        Self {
            router,
            store,
            line_items,
        }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `GET path`, optionally with a session cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    /// Sign in as `email` and return the session cookie (`name=value`).
    pub async fn sign_in(&self, email: &str) -> String {
        let customer = CurrentCustomer {
            email: email.to_string(),
            name: Some("Test Shopper".to_string()),
            image: None,
        };
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(SIGN_IN_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&customer).unwrap()))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let set_cookie = response
            .headers
            .get(header::SET_COOKIE)
            .expect("sign-in sets a session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

async fn sign_in(session: Session, Json(customer): Json<CurrentCustomer>) -> StatusCode {
    match set_current_customer(&session, &customer).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
