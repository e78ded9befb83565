//! Invoice persistence
//!
//! Invoices are write-once: there is no update or delete.

use fitscan_common::models::{Invoice, InvoiceLineItem};
use fitscan_common::{money, time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Insert the invoice header and its line items
pub async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> Result<()> {
    sqlx::query(
        "INSERT INTO invoices (invoice_id, session_id, grand_total, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&invoice.invoice_id)
    .bind(&invoice.session_id)
    .bind(money::to_db(&invoice.grand_total))
    .bind(time::to_db(&invoice.created_at))
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in invoice.line_items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_line_items (
                invoice_id, line_no, part_id, size_variant_id, part_name, size_name,
                quantity, unit_price, total
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.invoice_id)
        .bind(line_no as i64)
        .bind(&line.part_id)
        .bind(&line.size_variant_id)
        .bind(&line.part_name)
        .bind(&line.size_name)
        .bind(line.quantity)
        .bind(money::to_db(&line.unit_price))
        .bind(money::to_db(&line.total))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn load_invoice(pool: &SqlitePool, invoice_id: &str) -> Result<Option<Invoice>> {
    let Some(row) = sqlx::query(
        "SELECT invoice_id, session_id, grand_total, created_at FROM invoices WHERE invoice_id = ?",
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let line_rows = sqlx::query(&format!(
        "{} WHERE invoice_id = ? ORDER BY line_no",
        LINE_SELECT
    ))
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;

    let lines = line_rows.iter().map(row_to_line).collect::<Result<Vec<_>>>()?;
    Ok(Some(row_to_invoice(&row, lines)?))
}

/// All invoices, newest first
pub async fn list_invoices(pool: &SqlitePool) -> Result<Vec<Invoice>> {
    let rows = sqlx::query(
        r#"
        SELECT invoice_id, session_id, grand_total, created_at
        FROM invoices
        ORDER BY created_at DESC, invoice_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let line_rows = sqlx::query(&format!("{} ORDER BY invoice_id, line_no", LINE_SELECT))
        .fetch_all(pool)
        .await?;

    let mut lines_by_invoice: HashMap<String, Vec<InvoiceLineItem>> = HashMap::new();
    for row in &line_rows {
        let invoice_id: String = row.get("invoice_id");
        lines_by_invoice
            .entry(invoice_id)
            .or_default()
            .push(row_to_line(row)?);
    }

    rows.iter()
        .map(|row| {
            let invoice_id: String = row.get("invoice_id");
            let lines = lines_by_invoice.remove(&invoice_id).unwrap_or_default();
            row_to_invoice(row, lines)
        })
        .collect()
}

const LINE_SELECT: &str = r#"
    SELECT invoice_id, part_id, size_variant_id, part_name, size_name, quantity, unit_price, total
    FROM invoice_line_items"#;

fn row_to_invoice(row: &SqliteRow, line_items: Vec<InvoiceLineItem>) -> Result<Invoice> {
    let grand_total: String = row.get("grand_total");
    let created_at: String = row.get("created_at");
    Ok(Invoice {
        invoice_id: row.get("invoice_id"),
        session_id: row.get("session_id"),
        line_items,
        grand_total: money::from_db(&grand_total)?,
        created_at: time::from_db(&created_at)?,
    })
}

fn row_to_line(row: &SqliteRow) -> Result<InvoiceLineItem> {
    let unit_price: String = row.get("unit_price");
    let total: String = row.get("total");
    Ok(InvoiceLineItem {
        part_id: row.get("part_id"),
        size_variant_id: row.get("size_variant_id"),
        part_name: row.get("part_name"),
        size_name: row.get("size_name"),
        quantity: row.get("quantity"),
        unit_price: money::from_db(&unit_price)?,
        total: money::from_db(&total)?,
    })
}
