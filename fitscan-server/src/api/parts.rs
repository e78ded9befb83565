//! Part catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitscan_common::models::Part;

use crate::error::ApiResult;
use crate::services::catalog::{self, NewPart, PartUpdate, SeedReport};
use crate::AppState;

/// GET /api/parts
pub async fn list_parts(State(state): State<AppState>) -> ApiResult<Json<Vec<Part>>> {
    Ok(Json(catalog::list_parts(&state.db).await?))
}

/// POST /api/parts
pub async fn create_part(
    State(state): State<AppState>,
    Json(input): Json<NewPart>,
) -> ApiResult<(StatusCode, Json<Part>)> {
    let part = catalog::create_part(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(part)))
}

/// GET /api/parts/:id
pub async fn get_part(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Part>> {
    Ok(Json(catalog::get_part(&state.db, &id).await?))
}

/// PUT /api/parts/:id
pub async fn update_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PartUpdate>,
) -> ApiResult<Json<Part>> {
    Ok(Json(catalog::update_part(&state.db, &id, update).await?))
}

/// DELETE /api/parts/:id
pub async fn delete_part(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    catalog::delete_part(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/parts/seed-reference
pub async fn seed_reference(State(state): State<AppState>) -> ApiResult<Json<SeedReport>> {
    let entries = state.reference_catalog.entries();
    Ok(Json(catalog::seed_from_reference(&state.db, &entries).await?))
}

pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/api/parts", get(list_parts).post(create_part))
        .route("/api/parts/seed-reference", post(seed_reference))
        .route(
            "/api/parts/:id",
            get(get_part).put(update_part).delete(delete_part),
        )
}
