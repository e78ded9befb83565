//! Invoice records
//!
//! Line items are snapshots: names and prices are copied at creation time and
//! never follow later catalog edits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub part_id: String,
    pub size_variant_id: String,
    pub part_name: String,
    pub size_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub grand_total: Decimal,
    pub created_at: DateTime<Utc>,
}
