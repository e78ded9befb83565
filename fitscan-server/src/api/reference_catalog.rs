//! Reference catalog endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::ApiResult;
use crate::services::reference_catalog::CatalogEntry;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub entries: usize,
}

/// GET /api/reference-catalog
pub async fn list_entries(State(state): State<AppState>) -> Json<Vec<CatalogEntry>> {
    Json(state.reference_catalog.entries().as_ref().clone())
}

/// POST /api/reference-catalog/reload
pub async fn reload(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let entries = state.reference_catalog.reload()?;
    Ok(Json(ReloadResponse { entries }))
}

pub fn reference_catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reference-catalog", get(list_entries))
        .route("/api/reference-catalog/reload", post(reload))
}
