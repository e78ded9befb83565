//! Invoice generation
//!
//! Both entry points share the pricing core (line total = quantity × unit
//! price, grand total = sum of line totals) and the same persistence step:
//! invoice insert, one inventory decrement per line and, for scan invoices,
//! the session status change all commit together or not at all.

use fitscan_common::models::{Detection, Invoice, InvoiceLineItem, Part, ScanStatus};
use fitscan_common::{ids, money, time, Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};

use crate::db::{inventory, invoices, parts, sessions};
use crate::utils::begin_monitored;

/// One caller-supplied line of a manual invoice
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualLine {
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub size_variant_id: Option<String>,
    #[serde(default)]
    pub part_name: Option<String>,
    #[serde(default)]
    pub size_name: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualInvoiceRequest {
    #[serde(default)]
    pub line_items: Vec<ManualLine>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Recognized detections sharing one (part, size variant) key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionGroup {
    pub part_id: String,
    pub size_variant_id: String,
    pub quantity: i64,
}

/// Group billable detections by key in first-occurrence order
///
/// Each detection counts as quantity 1; unrecognized detections and those
/// without a resolved variant are skipped.
pub fn group_detections(detections: &[Detection]) -> Vec<DetectionGroup> {
    let mut groups: Vec<DetectionGroup> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for (part_id, size_variant_id) in detections.iter().filter_map(Detection::billable_key) {
        match index.get(&(part_id, size_variant_id)) {
            Some(&i) => groups[i].quantity += 1,
            None => {
                index.insert((part_id, size_variant_id), groups.len());
                groups.push(DetectionGroup {
                    part_id: part_id.to_string(),
                    size_variant_id: size_variant_id.to_string(),
                    quantity: 1,
                });
            }
        }
    }

    groups
}

/// Price groups against the catalog
///
/// A missing part or variant prices the line at 0 with empty names.
pub fn price_groups(
    groups: &[DetectionGroup],
    catalog: &HashMap<String, Part>,
) -> Result<Vec<InvoiceLineItem>> {
    groups
        .iter()
        .map(|g| {
            let part = catalog.get(&g.part_id);
            let variant = part.and_then(|p| p.variant(&g.size_variant_id));
            let unit_price = variant.map_or(Decimal::ZERO, |v| v.unit_price);

            Ok(InvoiceLineItem {
                part_id: g.part_id.clone(),
                size_variant_id: g.size_variant_id.clone(),
                part_name: part.map(|p| p.name.clone()).unwrap_or_default(),
                size_name: variant.map(|v| v.name.clone()).unwrap_or_default(),
                quantity: g.quantity,
                unit_price,
                total: money::line_total(g.quantity, unit_price)?,
            })
        })
        .collect()
}

pub fn grand_total(lines: &[InvoiceLineItem]) -> Result<Decimal> {
    money::checked_sum(lines.iter().map(|l| l.total))
}

/// Invoice from caller-supplied lines; inventory is decremented per line
///
/// Names left out of a line are filled from the catalog when the key exists.
pub async fn create_manual(pool: &SqlitePool, request: ManualInvoiceRequest) -> Result<Invoice> {
    let part_ids: Vec<String> = request
        .line_items
        .iter()
        .filter_map(|l| l.part_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let catalog = parts::find_parts(pool, &part_ids).await?;

    let lines = request
        .line_items
        .into_iter()
        .enumerate()
        .map(|(i, line)| manual_line(i, line, &catalog))
        .collect::<Result<Vec<_>>>()?;

    let invoice = build_invoice(request.session_id, lines)?;
    persist(pool, &invoice, None).await?;

    tracing::info!(
        invoice_id = %invoice.invoice_id,
        lines = invoice.line_items.len(),
        grand_total = %invoice.grand_total,
        "Manual invoice created"
    );

    Ok(invoice)
}

/// Invoice from a scan session's recognized detections
pub async fn create_from_session(pool: &SqlitePool, session_id: &str) -> Result<Invoice> {
    let session = sessions::load_session(pool, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {}", session_id)))?;

    if session.status == ScanStatus::ConvertedToInvoice {
        return Err(already_converted(session_id));
    }

    let groups = group_detections(&session.detections);
    let part_ids: Vec<String> = groups
        .iter()
        .map(|g| g.part_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let catalog = parts::find_parts(pool, &part_ids).await?;
    let lines = price_groups(&groups, &catalog).map_err(|e| {
        tracing::warn!(session_id, error = %e, "Scan session cannot be priced");
        e
    })?;

    let invoice = build_invoice(Some(session.session_id.clone()), lines)?;
    persist(pool, &invoice, Some(session_id)).await?;

    tracing::info!(
        invoice_id = %invoice.invoice_id,
        session_id,
        lines = invoice.line_items.len(),
        grand_total = %invoice.grand_total,
        "Invoice generated from scan session"
    );

    Ok(invoice)
}

pub async fn get_invoice(pool: &SqlitePool, invoice_id: &str) -> Result<Invoice> {
    invoices::load_invoice(pool, invoice_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Invoice {}", invoice_id)))
}

pub async fn list_invoices(pool: &SqlitePool) -> Result<Vec<Invoice>> {
    invoices::list_invoices(pool).await
}

fn build_invoice(session_id: Option<String>, line_items: Vec<InvoiceLineItem>) -> Result<Invoice> {
    Ok(Invoice {
        invoice_id: ids::invoice_id(),
        session_id,
        grand_total: grand_total(&line_items)?,
        line_items,
        created_at: time::now(),
    })
}

/// Insert the invoice, decrement inventory per line, then mark the session
async fn persist(pool: &SqlitePool, invoice: &Invoice, convert_session: Option<&str>) -> Result<()> {
    let mut tx = begin_monitored(pool, "invoice_generator::persist").await?;

    invoices::insert_invoice(&mut tx, invoice).await?;

    for line in &invoice.line_items {
        inventory::adjust_by(&mut *tx, &line.part_id, &line.size_variant_id, -line.quantity).await?;
    }

    if let Some(session_id) = convert_session {
        if !sessions::mark_converted(&mut *tx, session_id).await? {
            tx.rollback().await?;
            return Err(already_converted(session_id));
        }
    }

    tx.commit().await
}

fn already_converted(session_id: &str) -> Error {
    Error::Conflict(format!("Session {} was already converted to an invoice", session_id))
}

fn manual_line(index: usize, line: ManualLine, catalog: &HashMap<String, Part>) -> Result<InvoiceLineItem> {
    let part_id = non_empty(line.part_id)
        .ok_or_else(|| Error::InvalidInput(format!("Line {}: partId is required", index + 1)))?;
    let size_variant_id = non_empty(line.size_variant_id).ok_or_else(|| {
        Error::InvalidInput(format!("Line {}: sizeVariantId is required", index + 1))
    })?;
    if line.quantity < 0 {
        return Err(Error::InvalidInput(format!("Line {}: quantity must not be negative", index + 1)));
    }
    if line.unit_price < Decimal::ZERO {
        return Err(Error::InvalidInput(format!("Line {}: unitPrice must not be negative", index + 1)));
    }

    let part = catalog.get(&part_id);
    let variant = part.and_then(|p| p.variant(&size_variant_id));

    Ok(InvoiceLineItem {
        part_name: line
            .part_name
            .or_else(|| part.map(|p| p.name.clone()))
            .unwrap_or_default(),
        size_name: line
            .size_name
            .or_else(|| variant.map(|v| v.name.clone()))
            .unwrap_or_default(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        total: money::line_total(line.quantity, line.unit_price)
            .map_err(|e| Error::InvalidInput(format!("Line {}: {}", index + 1, e)))?,
        part_id,
        size_variant_id,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fitscan_common::models::{BoundingBox, SizeVariant};

    fn detection(recognized: bool, part: Option<&str>, variant: Option<&str>) -> Detection {
        Detection {
            detection_id: ids::detection_id(),
            image_index: 0,
            bounding_box: BoundingBox { x: 0.0, y: 0.0, w: 1.0, h: 1.0 },
            recognized,
            confidence: 0.9,
            part_id: part.map(str::to_string),
            size_variant_id: variant.map(str::to_string),
            guidance: None,
        }
    }

    fn part(id: &str, name: &str, variants: &[(&str, &str, i64)]) -> Part {
        Part {
            part_id: id.to_string(),
            name: name.to_string(),
            category: None,
            description: None,
            size_variants: variants
                .iter()
                .map(|(vid, vname, cents)| SizeVariant {
                    id: vid.to_string(),
                    name: vname.to_string(),
                    unit_price: Decimal::new(*cents, 2),
                    dimensions: None,
                    reference_image_urls: Vec::new(),
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_grouping_counts_in_first_occurrence_order() {
        let detections = vec![
            detection(true, Some("B"), Some("s2")),
            detection(true, Some("A"), Some("s1")),
            detection(true, Some("B"), Some("s2")),
            detection(true, Some("A"), Some("s1")),
            detection(true, Some("A"), Some("s1")),
        ];
        let groups = group_detections(&detections);
        assert_eq!(
            groups,
            vec![
                DetectionGroup { part_id: "B".into(), size_variant_id: "s2".into(), quantity: 2 },
                DetectionGroup { part_id: "A".into(), size_variant_id: "s1".into(), quantity: 3 },
            ]
        );
    }

    #[test]
    fn test_unbillable_detections_excluded() {
        let mut high_confidence_unrecognized = detection(false, Some("A"), Some("s1"));
        high_confidence_unrecognized.confidence = 0.99;
        let detections = vec![
            high_confidence_unrecognized,
            detection(true, Some("A"), None),
            detection(true, None, Some("s1")),
        ];
        assert!(group_detections(&detections).is_empty());
    }

    #[test]
    fn test_pricing_scenario() {
        let catalog = HashMap::from([
            ("A".to_string(), part("A", "Part A", &[("s1", "Size 1", 1000)])),
            ("B".to_string(), part("B", "Part B", &[("s2", "Size 2", 2500)])),
        ]);
        let groups = vec![
            DetectionGroup { part_id: "A".into(), size_variant_id: "s1".into(), quantity: 3 },
            DetectionGroup { part_id: "B".into(), size_variant_id: "s2".into(), quantity: 1 },
        ];

        let lines = price_groups(&groups, &catalog).unwrap();
        assert_eq!(lines[0].total, Decimal::new(3000, 2));
        assert_eq!(lines[0].part_name, "Part A");
        assert_eq!(lines[1].total, Decimal::new(2500, 2));
        assert_eq!(lines[1].size_name, "Size 2");
        assert_eq!(grand_total(&lines).unwrap(), Decimal::new(5500, 2));
    }

    #[test]
    fn test_missing_catalog_entry_prices_at_zero() {
        let catalog = HashMap::from([("A".to_string(), part("A", "Part A", &[("s1", "Size 1", 1000)]))]);
        let groups = vec![
            DetectionGroup { part_id: "A".into(), size_variant_id: "gone".into(), quantity: 2 },
            DetectionGroup { part_id: "Z".into(), size_variant_id: "s9".into(), quantity: 1 },
        ];

        let lines = price_groups(&groups, &catalog).unwrap();
        assert_eq!(lines[0].part_name, "Part A");
        assert_eq!(lines[0].size_name, "");
        assert_eq!(lines[0].unit_price, Decimal::ZERO);
        assert_eq!(lines[1].part_name, "");
        assert_eq!(grand_total(&lines).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_manual_line_validation() {
        let catalog = HashMap::new();
        let missing_variant = ManualLine {
            part_id: Some("A".into()),
            quantity: 1,
            ..Default::default()
        };
        assert!(matches!(manual_line(0, missing_variant, &catalog), Err(Error::InvalidInput(_))));

        let negative = ManualLine {
            part_id: Some("A".into()),
            size_variant_id: Some("s1".into()),
            quantity: -1,
            ..Default::default()
        };
        assert!(matches!(manual_line(0, negative, &catalog), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_manual_line_fills_names_from_catalog() {
        let catalog = HashMap::from([("A".to_string(), part("A", "Part A", &[("s1", "Size 1", 1000)]))]);
        let line = manual_line(
            0,
            ManualLine {
                part_id: Some("A".into()),
                size_variant_id: Some("s1".into()),
                quantity: 2,
                unit_price: Decimal::new(750, 2),
                ..Default::default()
            },
            &catalog,
        )
        .unwrap();
        assert_eq!(line.part_name, "Part A");
        assert_eq!(line.size_name, "Size 1");
        assert_eq!(line.total, Decimal::new(1500, 2));
    }

    #[test]
    fn test_manual_line_total_overflow_is_rejected() {
        let line = ManualLine {
            part_id: Some("A".into()),
            size_variant_id: Some("s".into()),
            quantity: 1_000_000_000_000,
            unit_price: Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
            ..Default::default()
        };
        assert!(matches!(manual_line(0, line, &HashMap::new()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_overpriced_catalog_variant_is_an_error() {
        let mut expensive = part("A", "Part A", &[("s1", "Size 1", 0)]);
        expensive.size_variants[0].unit_price = Decimal::MAX;
        let catalog = HashMap::from([("A".to_string(), expensive)]);
        let groups = vec![DetectionGroup { part_id: "A".into(), size_variant_id: "s1".into(), quantity: 2 }];

        assert!(price_groups(&groups, &catalog).is_err());
    }

    #[test]
    fn test_grand_total_overflow_is_an_error() {
        let catalog = HashMap::from([
            ("A".to_string(), part("A", "Part A", &[("s1", "Size 1", 0)])),
        ]);
        let mut lines = price_groups(
            &[
                DetectionGroup { part_id: "A".into(), size_variant_id: "s1".into(), quantity: 1 },
                DetectionGroup { part_id: "A".into(), size_variant_id: "s1".into(), quantity: 1 },
            ],
            &catalog,
        )
        .unwrap();
        lines[0].total = Decimal::MAX;
        lines[1].total = Decimal::MAX;

        assert!(matches!(grand_total(&lines), Err(Error::InvalidInput(_))));
    }

    mod transaction {
        use super::*;
        use crate::services::scan_session::assemble_session;
        use fitscan_common::db::init_database;
        use tempfile::TempDir;

        async fn setup() -> (TempDir, SqlitePool) {
            let dir = TempDir::new().unwrap();
            let pool = init_database(&dir.path().join("fitscan.db")).await.unwrap();
            inventory::set_absolute(&pool, "A", "s1", 10).await.unwrap();
            (dir, pool)
        }

        fn invoice_for(session_id: Option<String>) -> Invoice {
            let line = InvoiceLineItem {
                part_id: "A".into(),
                size_variant_id: "s1".into(),
                part_name: "Part A".into(),
                size_name: "Size 1".into(),
                quantity: 3,
                unit_price: Decimal::new(1000, 2),
                total: Decimal::new(3000, 2),
            };
            build_invoice(session_id, vec![line]).unwrap()
        }

        async fn counts(pool: &SqlitePool) -> (i64, i64) {
            let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
                .fetch_one(pool)
                .await
                .unwrap();
            let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_line_items")
                .fetch_one(pool)
                .await
                .unwrap();
            (invoices, lines)
        }

        #[tokio::test]
        async fn test_converted_session_rolls_back_everything() {
            let (_dir, pool) = setup().await;
            let mut session = assemble_session(Vec::new(), Vec::new());
            session.status = ScanStatus::ConvertedToInvoice;
            sessions::insert_session(&pool, &session).await.unwrap();

            let invoice = invoice_for(Some(session.session_id.clone()));
            let result = persist(&pool, &invoice, Some(&session.session_id)).await;

            assert!(matches!(result, Err(Error::Conflict(_))));
            assert_eq!(counts(&pool).await, (0, 0));
            assert_eq!(inventory::get_quantity(&pool, "A", "s1").await.unwrap(), 10);
        }

        #[tokio::test]
        async fn test_missing_session_rolls_back_everything() {
            let (_dir, pool) = setup().await;

            let invoice = invoice_for(Some("scan-missing".into()));
            let result = persist(&pool, &invoice, Some("scan-missing")).await;

            assert!(result.is_err());
            assert_eq!(counts(&pool).await, (0, 0));
            assert_eq!(inventory::get_quantity(&pool, "A", "s1").await.unwrap(), 10);
        }

        #[tokio::test]
        async fn test_draft_session_commits_together() {
            let (_dir, pool) = setup().await;
            let session = assemble_session(Vec::new(), Vec::new());
            sessions::insert_session(&pool, &session).await.unwrap();

            let invoice = invoice_for(Some(session.session_id.clone()));
            persist(&pool, &invoice, Some(&session.session_id)).await.unwrap();

            assert_eq!(counts(&pool).await, (1, 1));
            assert_eq!(inventory::get_quantity(&pool, "A", "s1").await.unwrap(), 7);
            let stored = sessions::load_session(&pool, &session.session_id).await.unwrap().unwrap();
            assert_eq!(stored.status, ScanStatus::ConvertedToInvoice);
        }
    }
}
