//! Database initialization tests

use fitscan_common::db::init::init_database;
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("fitscan.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("fitscan.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitscan.db")).await.unwrap();

    let tables = table_names(&pool).await;
    for expected in [
        "inventory",
        "invoice_line_items",
        "invoices",
        "parts",
        "scan_sessions",
        "size_variants",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_inventory_key_is_unique() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitscan.db")).await.unwrap();

    let insert = "INSERT INTO inventory (part_id, size_variant_id, quantity_on_hand, last_updated) \
                  VALUES ('A', 's1', 0, '2024-01-01T00:00:00.000000Z')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let second = sqlx::query(insert).execute(&pool).await;

    let err = fitscan_common::Error::from(second.unwrap_err());
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn test_foreign_keys_enabled_on_pool_connections() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fitscan.db")).await.unwrap();

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}
