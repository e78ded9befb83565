//! Shared setup for HTTP integration tests
//!
//! Each test gets its own temporary root folder holding the database and
//! uploads; vision runs on the built-in stub only.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use fitscan_common::db::init_database;
use fitscan_server::services::detection_normalizer::ImageDimensions;
use fitscan_server::services::reference_catalog::{CatalogEntry, StaticCatalog};
use fitscan_server::services::upload_store::UploadStore;
use fitscan_server::services::vision::VisionAnalyzer;
use fitscan_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "fitscan-test-boundary";

pub struct TestApp {
    /// Keeps the database and uploads alive for the test
    pub dir: TempDir,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_catalog(Vec::new()).await
    }

    pub async fn with_catalog(entries: Vec<CatalogEntry>) -> Self {
        let dir = TempDir::new().unwrap();
        let db = init_database(&dir.path().join("fitscan.db")).await.unwrap();

        let uploads = UploadStore::new(dir.path().join("uploads"));
        uploads.ensure_dir().await.unwrap();

        let catalog = Arc::new(StaticCatalog::new(entries));
        let vision = Arc::new(VisionAnalyzer::with_providers(
            Vec::new(),
            ImageDimensions::default(),
        ));

        let state = AppState::new(db, vision, catalog, uploads);
        let router = build_router(state.clone());

        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::DELETE, uri, None).await
    }

    /// Create a part whose variants are `(name, unit price)` pairs
    pub async fn create_part(&self, part_id: &str, name: &str, variants: &[(&str, f64)]) -> Value {
        let variants: Vec<Value> = variants
            .iter()
            .map(|(n, price)| json!({ "name": n, "unitPrice": price }))
            .collect();
        let (status, body) = self
            .post(
                "/api/parts",
                json!({ "partId": part_id, "name": name, "sizeVariants": variants }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create part failed: {}", body);
        body
    }

    /// Inventory quantity for a key, None when the row does not exist
    pub async fn quantity(&self, part_id: &str, size_variant_id: &str) -> Option<i64> {
        let (_, rows) = self.get("/api/inventory").await;
        rows.as_array().unwrap().iter().find_map(|row| {
            (row["partId"] == part_id && row["sizeVariantId"] == size_variant_id)
                .then(|| row["quantityOnHand"].as_i64().unwrap())
        })
    }
}

/// Multipart upload request; each file is `(field name, file name, bytes)`
pub fn multipart_request(uri: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (field, file_name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::HOST, "localhost:4000")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
