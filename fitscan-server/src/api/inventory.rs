//! Inventory endpoints

use axum::{extract::State, routing::get, Json, Router};
use fitscan_common::models::{InventoryItem, InventoryView};
use serde::Deserialize;

use crate::db::inventory;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Absolute quantity for one key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub size_variant_id: Option<String>,
    #[serde(default)]
    pub quantity_on_hand: i64,
}

/// GET /api/inventory
pub async fn list_inventory(State(state): State<AppState>) -> ApiResult<Json<Vec<InventoryView>>> {
    Ok(Json(inventory::list_enriched(&state.db).await?))
}

/// PATCH /api/inventory
pub async fn set_quantity(
    State(state): State<AppState>,
    Json(request): Json<SetQuantityRequest>,
) -> ApiResult<Json<InventoryItem>> {
    let (Some(part_id), Some(size_variant_id)) = (
        request.part_id.filter(|p| !p.trim().is_empty()),
        request.size_variant_id.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "partId and sizeVariantId required".to_string(),
        ));
    };

    let item = inventory::set_absolute(
        &state.db,
        &part_id,
        &size_variant_id,
        request.quantity_on_hand,
    )
    .await?;

    tracing::info!(
        part_id = %item.part_id,
        size_variant_id = %item.size_variant_id,
        quantity_on_hand = item.quantity_on_hand,
        "Inventory quantity set"
    );

    Ok(Json(item))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new().route("/api/inventory", get(list_inventory).patch(set_quantity))
}
