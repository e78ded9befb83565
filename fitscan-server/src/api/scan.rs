//! Scan upload and session review endpoints

use axum::{
    body::Bytes,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use fitscan_common::models::ScanSession;

use crate::error::{ApiError, ApiResult};
use crate::services::scan_session::{self, SessionUpdate};
use crate::services::upload_store::{public_url, StoredImage};
use crate::services::vision::ImageInput;
use crate::AppState;

/// Multipart field carrying the images
pub const IMAGES_FIELD: &str = "images";
/// Images accepted per upload
pub const MAX_IMAGES: usize = 10;
/// Request body cap for uploads
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// POST /api/scan/upload
///
/// Stores the images, analyzes them in upload order and persists one draft
/// session.
pub async fn upload_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ScanSession>)> {
    let mut images: Vec<(StoredImage, Bytes)> = Vec::new();

    while let Some(field) = next_field(&state, &images, &mut multipart).await? {
        if field.name() != Some(IMAGES_FIELD) {
            tracing::debug!(field = ?field.name(), "Ignoring multipart field");
            continue;
        }
        if images.len() == MAX_IMAGES {
            discard(&state, &images).await;
            return Err(ApiError::BadRequest(format!(
                "At most {} images per upload",
                MAX_IMAGES
            )));
        }

        let original_name = field.file_name().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                discard(&state, &images).await;
                return Err(ApiError::BadRequest(format!("Failed to read upload: {}", e)));
            }
        };

        match state.uploads.store(original_name.as_deref(), &data).await {
            Ok(stored) => images.push((stored, data)),
            Err(e) => {
                discard(&state, &images).await;
                return Err(e.into());
            }
        }
    }

    if images.is_empty() {
        return Err(ApiError::BadRequest("No images uploaded".to_string()));
    }

    let base_url = base_url(&state, &headers);
    let image_urls: Vec<String> = images
        .iter()
        .map(|(stored, _)| public_url(&base_url, &stored.file_name))
        .collect();

    let mut detections_by_image = Vec::with_capacity(images.len());
    for (image_index, (stored, data)) in images.iter().enumerate() {
        let input = ImageInput {
            file_name: &stored.file_name,
            bytes: data,
        };
        detections_by_image.push(state.vision.analyze(&input, image_index).await);
    }

    match scan_session::create_session(&state.db, image_urls, detections_by_image).await {
        Ok(session) => Ok((StatusCode::CREATED, Json(session))),
        Err(e) => {
            discard(&state, &images).await;
            Err(e.into())
        }
    }
}

/// Next multipart field; a malformed body discards what was stored so far
async fn next_field<'m>(
    state: &AppState,
    stored: &[(StoredImage, Bytes)],
    multipart: &'m mut Multipart,
) -> ApiResult<Option<Field<'m>>> {
    match multipart.next_field().await {
        Ok(field) => Ok(field),
        Err(e) => {
            discard(state, stored).await;
            Err(ApiError::BadRequest(format!("Invalid multipart body: {}", e)))
        }
    }
}

async fn discard(state: &AppState, images: &[(StoredImage, Bytes)]) {
    let stored: Vec<StoredImage> = images.iter().map(|(s, _)| s.clone()).collect();
    state.uploads.discard(&stored).await;
}

/// Configured public base URL, else derived from the Host header
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.public_base_url {
        return url.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

/// GET /api/scan/sessions
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<ScanSession>>> {
    Ok(Json(scan_session::list_sessions(&state.db).await?))
}

/// GET /api/scan/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScanSession>> {
    Ok(Json(scan_session::get_session(&state.db, &id).await?))
}

/// PATCH /api/scan/sessions/:id
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<SessionUpdate>,
) -> ApiResult<Json<ScanSession>> {
    Ok(Json(scan_session::update_session(&state.db, &id, update).await?))
}

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/scan/upload",
            post(upload_scan).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/scan/sessions", get(list_sessions))
        .route("/api/scan/sessions/:id", get(get_session).patch(update_session))
}
