//! Inventory ledger
//!
//! One row per (part, size variant), guaranteed by the table's primary key.
//! Quantities have no lower bound; a negative value records an oversell.

use fitscan_common::models::{InventoryItem, InventoryView};
use fitscan_common::{money, time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Quantity on hand, 0 when no row exists
pub async fn get_quantity<'e, E>(executor: E, part_id: &str, size_variant_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity_on_hand FROM inventory WHERE part_id = ? AND size_variant_id = ?",
    )
    .bind(part_id)
    .bind(size_variant_id)
    .fetch_optional(executor)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Upsert to an exact quantity
pub async fn set_absolute<'e, E>(
    executor: E,
    part_id: &str,
    size_variant_id: &str,
    quantity: i64,
) -> Result<InventoryItem>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO inventory (part_id, size_variant_id, quantity_on_hand, last_updated)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(part_id, size_variant_id) DO UPDATE SET
            quantity_on_hand = excluded.quantity_on_hand,
            last_updated = excluded.last_updated
        RETURNING part_id, size_variant_id, quantity_on_hand, last_updated
        "#,
    )
    .bind(part_id)
    .bind(size_variant_id)
    .bind(quantity)
    .bind(time::to_db(&time::now()))
    .fetch_one(executor)
    .await?;

    row_to_item(&row)
}

/// Add `delta` to an existing row
///
/// A missing row is left missing; returns whether a row was changed.
pub async fn adjust_by<'e, E>(
    executor: E,
    part_id: &str,
    size_variant_id: &str,
    delta: i64,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET quantity_on_hand = quantity_on_hand + ?, last_updated = ?
        WHERE part_id = ? AND size_variant_id = ?
        "#,
    )
    .bind(delta)
    .bind(time::to_db(&time::now()))
    .bind(part_id)
    .bind(size_variant_id)
    .execute(executor)
    .await?;

    let changed = result.rows_affected() > 0;
    if !changed {
        tracing::warn!(
            part_id,
            size_variant_id,
            delta,
            "No inventory row for key, adjustment skipped"
        );
    }
    Ok(changed)
}

/// Create a zero-quantity row unless one exists
pub async fn ensure_row<'e, E>(executor: E, part_id: &str, size_variant_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO inventory (part_id, size_variant_id, quantity_on_hand, last_updated)
        VALUES (?, ?, 0, ?)
        "#,
    )
    .bind(part_id)
    .bind(size_variant_id)
    .bind(time::to_db(&time::now()))
    .execute(executor)
    .await?;

    Ok(())
}

/// Remove every row of one part
pub async fn delete_for_part<'e, E>(executor: E, part_id: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM inventory WHERE part_id = ?")
        .bind(part_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Every row with catalog names and price, most recently updated first
pub async fn list_enriched(pool: &SqlitePool) -> Result<Vec<InventoryView>> {
    let rows = sqlx::query(
        r#"
        SELECT i.part_id, i.size_variant_id, i.quantity_on_hand, i.last_updated,
               p.name AS part_name, v.name AS size_name, v.unit_price
        FROM inventory i
        LEFT JOIN parts p ON p.part_id = i.part_id
        LEFT JOIN size_variants v ON v.variant_id = i.size_variant_id AND v.part_id = i.part_id
        ORDER BY i.last_updated DESC, i.part_id, i.size_variant_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let unit_price: Option<String> = row.get("unit_price");
            Ok(InventoryView {
                item: row_to_item(row)?,
                part_name: row.get("part_name"),
                size_name: row.get("size_name"),
                unit_price: unit_price.as_deref().map(money::from_db).transpose()?,
            })
        })
        .collect()
}

fn row_to_item(row: &SqliteRow) -> Result<InventoryItem> {
    let last_updated: String = row.get("last_updated");
    Ok(InventoryItem {
        part_id: row.get("part_id"),
        size_variant_id: row.get("size_variant_id"),
        quantity_on_hand: row.get("quantity_on_hand"),
        last_updated: time::from_db(&last_updated)?,
    })
}
