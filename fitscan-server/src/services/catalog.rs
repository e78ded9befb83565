//! Part catalog management
//!
//! Every variant a part gains gets a zero-quantity inventory row in the same
//! transaction as the part write.

use fitscan_common::models::{Dimensions, Part, SizeVariant};
use fitscan_common::{ids, time, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use super::reference_catalog::CatalogEntry;
use crate::db::{inventory, parts};
use crate::utils::begin_monitored;

/// Variant as sent by a client; `id` keeps an existing variant on update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeVariantInput {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub reference_image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size_variants: Vec<SizeVariantInput>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size_variants: Option<Vec<SizeVariantInput>>,
}

/// Result of seeding parts from the reference catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub ok: bool,
    pub created: usize,
    pub total: usize,
}

pub async fn get_part(pool: &SqlitePool, part_id: &str) -> Result<Part> {
    let mut conn = pool.acquire().await?;
    parts::load_part(&mut conn, part_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Part {}", part_id)))
}

pub async fn list_parts(pool: &SqlitePool) -> Result<Vec<Part>> {
    parts::list_parts(pool).await
}

/// Create a part and an inventory row per variant
pub async fn create_part(pool: &SqlitePool, input: NewPart) -> Result<Part> {
    let name = required_name(input.name.as_deref(), "Part name")?;
    let part_id = match input.part_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ids::part_id(),
    };

    let size_variants = input
        .size_variants
        .into_iter()
        .map(|v| build_variant(v, None))
        .collect::<Result<Vec<_>>>()?;

    let now = time::now();
    let part = Part {
        part_id,
        name,
        category: input.category,
        description: input.description,
        size_variants,
        created_at: now,
        updated_at: now,
    };

    let mut tx = begin_monitored(pool, "catalog::create_part").await?;
    let inserted = parts::insert_part(&mut tx, &part).await;
    if let Err(e) = inserted {
        tx.rollback().await?;
        return Err(if e.is_unique_violation() {
            Error::Conflict(format!("Part {} already exists", part.part_id))
        } else {
            e
        });
    }
    ensure_inventory_rows(&mut tx, &part).await?;
    tx.commit().await?;

    tracing::info!(
        part_id = %part.part_id,
        variants = part.size_variants.len(),
        "Part created"
    );

    Ok(part)
}

/// Apply a partial update
///
/// Variants sent with a known `id` keep it; others get a fresh id and an
/// inventory row. Inventory rows of variants dropped from the list are kept.
pub async fn update_part(pool: &SqlitePool, part_id: &str, update: PartUpdate) -> Result<Part> {
    let mut tx = begin_monitored(pool, "catalog::update_part").await?;

    let existing = parts::load_part(&mut tx, part_id).await?;
    let Some(mut part) = existing else {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Part {}", part_id)));
    };

    if let Some(name) = update.name {
        part.name = required_name(Some(&name), "Part name")?;
    }
    if let Some(category) = update.category {
        part.category = Some(category);
    }
    if let Some(description) = update.description {
        part.description = Some(description);
    }
    if let Some(inputs) = update.size_variants {
        let existing = std::mem::take(&mut part.size_variants);
        part.size_variants = inputs
            .into_iter()
            .map(|input| {
                let previous = input
                    .id
                    .as_deref()
                    .and_then(|id| existing.iter().find(|v| v.id == id));
                build_variant(input, previous)
            })
            .collect::<Result<Vec<_>>>()?;
    }
    part.updated_at = time::now();

    parts::replace_part(&mut tx, &part).await?;
    ensure_inventory_rows(&mut tx, &part).await?;
    tx.commit().await?;

    tracing::info!(part_id = %part.part_id, variants = part.size_variants.len(), "Part updated");

    Ok(part)
}

/// Delete a part, its variants and exactly its inventory rows
pub async fn delete_part(pool: &SqlitePool, part_id: &str) -> Result<()> {
    let mut tx = begin_monitored(pool, "catalog::delete_part").await?;

    if !parts::delete_part(&mut tx, part_id).await? {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Part {}", part_id)));
    }
    let removed = inventory::delete_for_part(&mut *tx, part_id).await?;
    tx.commit().await?;

    tracing::info!(part_id, inventory_rows = removed, "Part deleted");
    Ok(())
}

/// Create a part for every reference entry not yet in the catalog
///
/// Seeded parts have one zero-priced variant named after the part id.
pub async fn seed_from_reference(pool: &SqlitePool, entries: &[CatalogEntry]) -> Result<SeedReport> {
    let mut created = 0;

    for entry in entries {
        if parts::part_exists(pool, &entry.part_id).await? {
            continue;
        }

        let input = NewPart {
            part_id: Some(entry.part_id.clone()),
            name: Some(entry.name.clone()),
            category: Some(entry.series.clone()),
            description: Some(format!("Reference catalog - {}", entry.series)),
            size_variants: vec![SizeVariantInput {
                name: Some(entry.part_id.clone()),
                unit_price: Some(Decimal::ZERO),
                ..Default::default()
            }],
        };

        match create_part(pool, input).await {
            Ok(_) => created += 1,
            // Created concurrently since the existence check
            Err(Error::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!(created, total = entries.len(), "Seeded parts from reference catalog");

    Ok(SeedReport {
        ok: true,
        created,
        total: entries.len(),
    })
}

async fn ensure_inventory_rows(conn: &mut SqliteConnection, part: &Part) -> Result<()> {
    for variant in &part.size_variants {
        inventory::ensure_row(&mut *conn, &part.part_id, &variant.id).await?;
    }
    Ok(())
}

fn required_name(name: Option<&str>, what: &str) -> Result<String> {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => Ok(n.to_string()),
        _ => Err(Error::InvalidInput(format!("{} is required", what))),
    }
}

/// Build a stored variant from client input, starting from `previous` when
/// the input names an existing variant
fn build_variant(input: SizeVariantInput, previous: Option<&SizeVariant>) -> Result<SizeVariant> {
    let name = match (input.name.as_deref(), previous) {
        (Some(n), _) => required_name(Some(n), "Size variant name")?,
        (None, Some(prev)) => prev.name.clone(),
        (None, None) => return Err(Error::InvalidInput("Size variant name is required".to_string())),
    };

    let unit_price = input
        .unit_price
        .or_else(|| previous.map(|p| p.unit_price))
        .unwrap_or(Decimal::ZERO);
    if unit_price < Decimal::ZERO {
        return Err(Error::InvalidInput(format!(
            "Size variant {} has a negative unit price",
            name
        )));
    }

    Ok(SizeVariant {
        id: previous.map_or_else(ids::variant_id, |p| p.id.clone()),
        name,
        unit_price,
        dimensions: input
            .dimensions
            .or_else(|| previous.and_then(|p| p.dimensions.clone())),
        reference_image_urls: input
            .reference_image_urls
            .or_else(|| previous.map(|p| p.reference_image_urls.clone()))
            .unwrap_or_default(),
    })
}
