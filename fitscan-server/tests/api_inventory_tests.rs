//! Inventory ledger API tests

mod helpers;

use axum::http::StatusCode;
use fitscan_server::db::inventory;
use helpers::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_set_absolute_is_idempotent() {
    let app = TestApp::new().await;
    let body = json!({ "partId": "A", "sizeVariantId": "s1", "quantityOnHand": 7 });

    let (status, item) = app.patch("/api/inventory", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantityOnHand"], 7);

    app.patch("/api/inventory", body).await;

    let (_, rows) = app.get("/api/inventory").await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["quantityOnHand"], 7);
}

#[tokio::test]
async fn test_set_requires_key() {
    let app = TestApp::new().await;

    let (status, _) = app
        .patch("/api/inventory", json!({ "sizeVariantId": "s1", "quantityOnHand": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/api/inventory", json!({ "partId": "A", "sizeVariantId": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quantity_defaults_to_zero() {
    let app = TestApp::new().await;
    let (status, item) = app
        .patch("/api/inventory", json!({ "partId": "A", "sizeVariantId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantityOnHand"], 0);
}

#[tokio::test]
async fn test_listing_is_enriched_from_catalog() {
    let app = TestApp::new().await;
    let part = app.create_part("A", "Part A", &[("1 inch", 10.0)]).await;
    let variant_id = part["sizeVariants"][0]["id"].as_str().unwrap();

    app.patch(
        "/api/inventory",
        json!({ "partId": "A", "sizeVariantId": variant_id, "quantityOnHand": 4 }),
    )
    .await;
    app.patch(
        "/api/inventory",
        json!({ "partId": "ghost", "sizeVariantId": "gone", "quantityOnHand": 1 }),
    )
    .await;

    let (_, rows) = app.get("/api/inventory").await;
    let rows = rows.as_array().unwrap();

    let known = rows.iter().find(|r| r["partId"] == "A").unwrap();
    assert_eq!(known["partName"], "Part A");
    assert_eq!(known["sizeName"], "1 inch");
    assert_eq!(known["unitPrice"], 10.0);
    assert_eq!(known["quantityOnHand"], 4);

    let stale = rows.iter().find(|r| r["partId"] == "ghost").unwrap();
    assert!(stale["partName"].is_null());
    assert!(stale["unitPrice"].is_null());
}

#[tokio::test]
async fn test_adjust_by_missing_row_is_noop() {
    let app = TestApp::new().await;
    let pool = &app.state.db;

    assert!(!inventory::adjust_by(pool, "A", "s1", -2).await.unwrap());
    assert_eq!(inventory::get_quantity(pool, "A", "s1").await.unwrap(), 0);
    assert_eq!(app.quantity("A", "s1").await, None);

    inventory::ensure_row(pool, "A", "s1").await.unwrap();
    assert!(inventory::adjust_by(pool, "A", "s1", -2).await.unwrap());
    assert_eq!(inventory::get_quantity(pool, "A", "s1").await.unwrap(), -2);

    // ensure_row never resets an existing row
    inventory::ensure_row(pool, "A", "s1").await.unwrap();
    assert_eq!(inventory::get_quantity(pool, "A", "s1").await.unwrap(), -2);
}
