//! Invoice endpoints
//!
//! Invoices are immutable once created: there is no update or delete route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitscan_common::models::Invoice;

use crate::error::ApiResult;
use crate::services::invoice_generator::{self, ManualInvoiceRequest};
use crate::AppState;

/// GET /api/invoices
pub async fn list_invoices(State(state): State<AppState>) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(invoice_generator::list_invoices(&state.db).await?))
}

/// GET /api/invoices/:id
pub async fn get_invoice(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Invoice>> {
    Ok(Json(invoice_generator::get_invoice(&state.db, &id).await?))
}

/// POST /api/invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<ManualInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = invoice_generator::create_manual(&state.db, request).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// POST /api/invoices/from-scan/:session_id
pub async fn create_from_scan(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = invoice_generator::create_from_session(&state.db, &session_id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/:id", get(get_invoice))
        .route("/api/invoices/from-scan/:session_id", post(create_from_scan))
}
