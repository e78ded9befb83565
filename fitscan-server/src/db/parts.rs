//! Catalog store: parts and their ordered size variants

use fitscan_common::models::{Dimensions, Part, SizeVariant};
use fitscan_common::{money, time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

use super::{from_json, to_json};

/// Insert a part with all of its variants
pub async fn insert_part(conn: &mut SqliteConnection, part: &Part) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO parts (part_id, name, category, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&part.part_id)
    .bind(&part.name)
    .bind(&part.category)
    .bind(&part.description)
    .bind(time::to_db(&part.created_at))
    .bind(time::to_db(&part.updated_at))
    .execute(&mut *conn)
    .await?;

    insert_variants(conn, &part.part_id, &part.size_variants).await
}

/// Overwrite a part's fields and variant list, keeping `created_at`
///
/// Returns false when the part does not exist.
pub async fn replace_part(conn: &mut SqliteConnection, part: &Part) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE parts SET name = ?, category = ?, description = ?, updated_at = ?
        WHERE part_id = ?
        "#,
    )
    .bind(&part.name)
    .bind(&part.category)
    .bind(&part.description)
    .bind(time::to_db(&part.updated_at))
    .bind(&part.part_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM size_variants WHERE part_id = ?")
        .bind(&part.part_id)
        .execute(&mut *conn)
        .await?;
    insert_variants(conn, &part.part_id, &part.size_variants).await?;

    Ok(true)
}

async fn insert_variants(
    conn: &mut SqliteConnection,
    part_id: &str,
    variants: &[SizeVariant],
) -> Result<()> {
    for (position, variant) in variants.iter().enumerate() {
        let dims = variant.dimensions.clone().unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO size_variants (
                variant_id, part_id, position, name, unit_price,
                width_mm, height_mm, depth_mm, reference_image_urls
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&variant.id)
        .bind(part_id)
        .bind(position as i64)
        .bind(&variant.name)
        .bind(money::to_db(&variant.unit_price))
        .bind(dims.width_mm)
        .bind(dims.height_mm)
        .bind(dims.depth_mm)
        .bind(to_json(&variant.reference_image_urls, "reference image urls")?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Delete a part; its variants go with it (foreign key cascade)
pub async fn delete_part(conn: &mut SqliteConnection, part_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM parts WHERE part_id = ?")
        .bind(part_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_part(conn: &mut SqliteConnection, part_id: &str) -> Result<Option<Part>> {
    let row = sqlx::query(
        "SELECT part_id, name, category, description, created_at, updated_at FROM parts WHERE part_id = ?",
    )
    .bind(part_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let variant_rows = sqlx::query(&format!(
        "{} WHERE part_id = ? ORDER BY position",
        VARIANT_SELECT
    ))
    .bind(part_id)
    .fetch_all(&mut *conn)
    .await?;

    let variants = variant_rows
        .iter()
        .map(row_to_variant)
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(row_to_part(&row, variants)?))
}

/// All parts, newest first
pub async fn list_parts(pool: &SqlitePool) -> Result<Vec<Part>> {
    let rows = sqlx::query(
        r#"
        SELECT part_id, name, category, description, created_at, updated_at
        FROM parts
        ORDER BY created_at DESC, part_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let variant_rows = sqlx::query(&format!("{} ORDER BY part_id, position", VARIANT_SELECT))
        .fetch_all(pool)
        .await?;

    assemble(rows, variant_rows)
}

/// Parts with the given ids, keyed by part id
pub async fn find_parts(pool: &SqlitePool, part_ids: &[String]) -> Result<HashMap<String, Part>> {
    if part_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids = to_json(part_ids, "part ids")?;

    let rows = sqlx::query(
        r#"
        SELECT part_id, name, category, description, created_at, updated_at
        FROM parts
        WHERE part_id IN (SELECT value FROM json_each(?))
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let variant_rows = sqlx::query(&format!(
        "{} WHERE part_id IN (SELECT value FROM json_each(?)) ORDER BY part_id, position",
        VARIANT_SELECT
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(assemble(rows, variant_rows)?
        .into_iter()
        .map(|p| (p.part_id.clone(), p))
        .collect())
}

/// First declared variant id per part, for the given part ids
///
/// Parts that are unknown or have no variants are absent from the map.
pub async fn first_variant_ids(
    pool: &SqlitePool,
    part_ids: &[String],
) -> Result<HashMap<String, String>> {
    if part_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT part_id, variant_id
        FROM size_variants
        WHERE part_id IN (SELECT value FROM json_each(?))
        ORDER BY part_id, position
        "#,
    )
    .bind(to_json(part_ids, "part ids")?)
    .fetch_all(pool)
    .await?;

    let mut first = HashMap::new();
    for row in rows {
        let part_id: String = row.get("part_id");
        let variant_id: String = row.get("variant_id");
        first.entry(part_id).or_insert(variant_id);
    }
    Ok(first)
}

pub async fn part_exists(pool: &SqlitePool, part_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parts WHERE part_id = ?")
        .bind(part_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

const VARIANT_SELECT: &str = r#"
    SELECT variant_id, part_id, name, unit_price, width_mm, height_mm, depth_mm, reference_image_urls
    FROM size_variants"#;

fn assemble(part_rows: Vec<SqliteRow>, variant_rows: Vec<SqliteRow>) -> Result<Vec<Part>> {
    let mut variants_by_part: HashMap<String, Vec<SizeVariant>> = HashMap::new();
    for row in &variant_rows {
        let part_id: String = row.get("part_id");
        variants_by_part
            .entry(part_id)
            .or_default()
            .push(row_to_variant(row)?);
    }

    part_rows
        .iter()
        .map(|row| {
            let part_id: String = row.get("part_id");
            let variants = variants_by_part.remove(&part_id).unwrap_or_default();
            row_to_part(row, variants)
        })
        .collect()
}

fn row_to_part(row: &SqliteRow, size_variants: Vec<SizeVariant>) -> Result<Part> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Part {
        part_id: row.get("part_id"),
        name: row.get("name"),
        category: row.get("category"),
        description: row.get("description"),
        size_variants,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

fn row_to_variant(row: &SqliteRow) -> Result<SizeVariant> {
    let unit_price: String = row.get("unit_price");
    let urls: String = row.get("reference_image_urls");
    let dims = Dimensions {
        width_mm: row.get("width_mm"),
        height_mm: row.get("height_mm"),
        depth_mm: row.get("depth_mm"),
    };
    let has_dims = dims.width_mm.is_some() || dims.height_mm.is_some() || dims.depth_mm.is_some();

    Ok(SizeVariant {
        id: row.get("variant_id"),
        name: row.get("name"),
        unit_price: money::from_db(&unit_price)?,
        dimensions: has_dims.then_some(dims),
        reference_image_urls: from_json(&urls, "reference image urls")?,
    })
}
