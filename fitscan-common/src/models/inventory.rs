//! Inventory ledger records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity on hand for one (part, size variant) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub part_id: String,
    pub size_variant_id: String,
    /// May be negative: decrements are not guarded
    pub quantity_on_hand: i64,
    pub last_updated: DateTime<Utc>,
}

/// Inventory row joined with catalog names and price
///
/// Catalog fields are absent when the row references a removed part or variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub part_name: Option<String>,
    pub size_name: Option<String>,
    pub unit_price: Option<Decimal>,
}
