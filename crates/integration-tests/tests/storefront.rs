//! Health, catalog and middleware tests through the storefront router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;

use modern_shop_integration_tests::{
    FakeCatalog, FakeLineItems, FakeOrderStore, TestApp, product,
};
use modern_shop_storefront::middleware::REQUEST_ID_HEADER;
use modern_shop_storefront::orders::OrderHistorySettings;

fn app_with_catalog(catalog: FakeCatalog) -> TestApp {
    TestApp::with(
        FakeOrderStore::default(),
        FakeLineItems::default(),
        catalog,
        OrderHistorySettings::default(),
    )
}

#[tokio::test]
async fn health_is_ok() {
    let app = app_with_catalog(FakeCatalog(None));

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn readiness_fails_without_session_database() {
    let app = app_with_catalog(FakeCatalog(None));

    let response = app.get("/health/ready", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app_with_catalog(FakeCatalog(None));

    let response = app.get("/health", None).await;

    assert!(response.headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn home_and_api_list_products() {
    let app = app_with_catalog(FakeCatalog(Some(vec![
        product("1", "Canvas Tote"),
        product("2", "Wool Beanie"),
    ])));

    for path in ["/", "/api/products"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status, StatusCode::OK, "{path}");

        let body = response.json();
        let products = body["products"].as_array().unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0]["title"], "Canvas Tote");
        assert_eq!(products[0]["price"], "24.50");
    }
}

#[tokio::test]
async fn catalog_outage_is_bad_gateway() {
    let app = app_with_catalog(FakeCatalog(None));

    let response = app.get("/api/products", None).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn unknown_path_is_json_not_found() {
    let app = app_with_catalog(FakeCatalog(None));

    let response = app.get("/no/such/page", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Not found: /no/such/page");
}
