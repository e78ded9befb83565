//! Scan session aggregation
//!
//! Builds one session from the per-image detection lists of an upload and
//! applies user edits during review.

use fitscan_common::models::{Detection, ScanSession, ScanStatus};
use fitscan_common::{ids, time, Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::variant_resolver;
use crate::db::sessions;

/// Review edit; each provided field replaces the stored one wholesale
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub status: Option<ScanStatus>,
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
}

/// Concatenate per-image detections in image order into a draft session
pub fn assemble_session(image_urls: Vec<String>, detections_by_image: Vec<Vec<Detection>>) -> ScanSession {
    let detections = detections_by_image
        .into_iter()
        .enumerate()
        .flat_map(|(image_index, detections)| {
            detections.into_iter().map(move |mut d| {
                d.image_index = image_index;
                d
            })
        })
        .collect();

    let now = time::now();
    ScanSession {
        session_id: ids::session_id(),
        image_urls,
        detections,
        status: ScanStatus::Draft,
        created_at: now,
        updated_at: now,
    }
}

/// Assemble, resolve size variants and persist a new draft session
pub async fn create_session(
    pool: &SqlitePool,
    image_urls: Vec<String>,
    detections_by_image: Vec<Vec<Detection>>,
) -> Result<ScanSession> {
    let mut session = assemble_session(image_urls, detections_by_image);
    session.detections = variant_resolver::resolve_size_variants(pool, session.detections).await?;
    sessions::insert_session(pool, &session).await?;

    tracing::info!(
        session_id = %session.session_id,
        images = session.image_urls.len(),
        detections = session.detections.len(),
        "Scan session created"
    );

    Ok(session)
}

pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<ScanSession>> {
    sessions::list_sessions(pool).await
}

pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<ScanSession> {
    sessions::load_session(pool, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {}", session_id)))
}

pub async fn update_session(
    pool: &SqlitePool,
    session_id: &str,
    update: SessionUpdate,
) -> Result<ScanSession> {
    let detections_json = update
        .detections
        .as_deref()
        .map(sessions::encode_detections)
        .transpose()?;

    let updated = sessions::update_session(pool, session_id, update.status, detections_json).await?;
    if !updated {
        return match sessions::load_session(pool, session_id).await? {
            Some(_) => Err(Error::Conflict(format!(
                "Session {} was converted to an invoice, its status is final",
                session_id
            ))),
            None => Err(Error::NotFound(format!("Session {}", session_id))),
        };
    }

    tracing::debug!(
        session_id,
        status = ?update.status,
        detections_replaced = update.detections.is_some(),
        "Scan session updated"
    );

    get_session(pool, session_id).await
}
