//! fitscan-server library interface
//!
//! Exposes the router and application state so integration tests can drive
//! the service in-process.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::reference_catalog::CatalogReader;
use crate::services::upload_store::UploadStore;
use crate::services::vision::VisionAnalyzer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub vision: Arc<VisionAnalyzer>,
    /// Reference list for the vision prompt and part seeding
    pub reference_catalog: Arc<dyn CatalogReader>,
    pub uploads: UploadStore,
    /// Overrides the Host-derived base of image URLs
    pub public_base_url: Option<String>,
    /// Origin allowed by CORS; `None` disables the CORS layer
    pub frontend_origin: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        vision: Arc<VisionAnalyzer>,
        reference_catalog: Arc<dyn CatalogReader>,
        uploads: UploadStore,
    ) -> Self {
        Self {
            db,
            vision,
            reference_catalog,
            uploads,
            public_base_url: None,
            frontend_origin: None,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());
    let cors = state.frontend_origin.as_deref().and_then(cors_layer);

    let router = Router::new()
        .merge(api::health_routes())
        .merge(api::part_routes())
        .merge(api::reference_catalog_routes())
        .merge(api::scan_routes())
        .merge(api::inventory_routes())
        .merge(api::invoice_routes())
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(value))
                .allow_methods(Any)
                .allow_headers(Any),
        ),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid frontend origin, CORS disabled");
            None
        }
    }
}
