//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates every table with
//! `CREATE TABLE IF NOT EXISTS`, so startup is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every pooled connection
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas go through the connect options so that every
    // pooled connection gets them, not only the first one
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_parts_table(pool).await?;
    create_size_variants_table(pool).await?;
    create_scan_sessions_table(pool).await?;
    create_inventory_table(pool).await?;
    create_invoices_table(pool).await?;
    create_invoice_line_items_table(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_parts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            part_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Size variants keep their declaration order in `position`
async fn create_size_variants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS size_variants (
            variant_id TEXT PRIMARY KEY,
            part_id TEXT NOT NULL REFERENCES parts(part_id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            unit_price TEXT NOT NULL,
            width_mm REAL,
            height_mm REAL,
            depth_mm REAL,
            reference_image_urls TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_size_variants_part ON size_variants(part_id, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Image URLs and detections are JSON arrays; they are only ever replaced wholesale
async fn create_scan_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_sessions (
            session_id TEXT PRIMARY KEY,
            image_urls TEXT NOT NULL DEFAULT '[]',
            detections TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'resolved', 'converted_to_invoice')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// The composite primary key is the uniqueness guarantee for (part, variant)
async fn create_inventory_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory (
            part_id TEXT NOT NULL,
            size_variant_id TEXT NOT NULL,
            quantity_on_hand INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (part_id, size_variant_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_invoices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            invoice_id TEXT PRIMARY KEY,
            session_id TEXT,
            grand_total TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_invoice_line_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoice_line_items (
            invoice_id TEXT NOT NULL REFERENCES invoices(invoice_id) ON DELETE CASCADE,
            line_no INTEGER NOT NULL,
            part_id TEXT NOT NULL,
            size_variant_id TEXT NOT NULL,
            part_name TEXT NOT NULL,
            size_name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            unit_price TEXT NOT NULL,
            total TEXT NOT NULL,
            PRIMARY KEY (invoice_id, line_no)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
