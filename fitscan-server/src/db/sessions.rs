//! Scan session persistence
//!
//! Image URLs and detections live in JSON columns and are only ever replaced
//! wholesale.

use fitscan_common::models::{ScanSession, ScanStatus};
use fitscan_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use super::{from_json, to_json};

const SESSION_COLUMNS: &str =
    "session_id, image_urls, detections, status, created_at, updated_at";

pub async fn insert_session<'e, E>(executor: E, session: &ScanSession) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO scan_sessions (session_id, image_urls, detections, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.session_id)
    .bind(to_json(&session.image_urls, "image urls")?)
    .bind(to_json(&session.detections, "detections")?)
    .bind(session.status.as_str())
    .bind(time::to_db(&session.created_at))
    .bind(time::to_db(&session.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn load_session<'e, E>(executor: E, session_id: &str) -> Result<Option<ScanSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM scan_sessions WHERE session_id = ?",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(row_to_session).transpose()
}

/// All sessions, newest first
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<ScanSession>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM scan_sessions ORDER BY created_at DESC, session_id",
        SESSION_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_session).collect()
}

/// Overwrite whichever of status / detections is given
///
/// `detections_json` is the already-encoded detection array. A converted
/// session keeps its status. Returns false when the session does not exist
/// or the update would move a converted session to another status.
pub async fn update_session<'e, E>(
    executor: E,
    session_id: &str,
    status: Option<ScanStatus>,
    detections_json: Option<String>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE scan_sessions
        SET status = COALESCE(?, status),
            detections = COALESCE(?, detections),
            updated_at = ?
        WHERE session_id = ?
          AND (status != ? OR COALESCE(?, status) = ?)
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(detections_json)
    .bind(time::to_db(&time::now()))
    .bind(session_id)
    .bind(ScanStatus::ConvertedToInvoice.as_str())
    .bind(status.map(|s| s.as_str()))
    .bind(ScanStatus::ConvertedToInvoice.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move a session to `converted_to_invoice`
///
/// Returns false when the session is missing or was already converted, so
/// two concurrent conversions cannot both succeed.
pub async fn mark_converted<'e, E>(executor: E, session_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE scan_sessions
        SET status = ?, updated_at = ?
        WHERE session_id = ? AND status != ?
        "#,
    )
    .bind(ScanStatus::ConvertedToInvoice.as_str())
    .bind(time::to_db(&time::now()))
    .bind(session_id)
    .bind(ScanStatus::ConvertedToInvoice.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) fn encode_detections(detections: &[fitscan_common::models::Detection]) -> Result<String> {
    to_json(detections, "detections")
}

fn row_to_session(row: &SqliteRow) -> Result<ScanSession> {
    let image_urls: String = row.get("image_urls");
    let detections: String = row.get("detections");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ScanSession {
        session_id: row.get("session_id"),
        image_urls: from_json(&image_urls, "image urls")?,
        detections: from_json(&detections, "detections")?,
        status: status.parse()?,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}
