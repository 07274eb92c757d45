//! Consolidated ("mother") invoice composer.
//!
//! One multi-page document: every shipment becomes a table row. The page
//! header (shipper, consignee, trade metadata panel) and the table header row
//! repeat on every page; the aggregate totals footer is drawn once at the end.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::invoice::InvoiceSet;
use crate::pdf::{line_height, wrap_text, PageWriter, MARGIN, PAGE_WIDTH};

/// Fixed output name; prior runs are overwritten.
pub const SUMMARY_FILENAME: &str = "mother_invoice.pdf";

const RIGHT: f64 = PAGE_WIDTH - MARGIN;
/// Rows are not laid out below this line; the footer gets its own space.
const BODY_LIMIT: f64 = 272.0;

const SUMMARY_COLUMNS: [f64; 12] = [
    8.0, 28.0, 18.0, 18.0, 20.0, 38.0, 12.0, 8.0, 13.0, 13.0, 7.0, 7.0,
];

const SUMMARY_HEADERS: [&str; 12] = [
    "S.No",
    "Buyer",
    "Invoice No.",
    "Order ID",
    "AWB No.",
    "Description HSN UOM",
    "Net Wt (KG)",
    "Qty",
    "Unit Val",
    "Total Val",
    "IGST %",
    "IGST Paid",
];

/// Render the summary document into `output_dir`. Tolerates an empty set by
/// producing header and footer with no data rows.
pub fn compose_summary_document(
    set: &InvoiceSet,
    output_dir: &Path,
    config: &AppConfig,
) -> Result<String> {
    let today = Local::now().date_naive();
    let mut writer = PageWriter::new("Commercial Invoice cum Packing List")?;

    let cols = column_bounds();
    let mut y = draw_page_header(&writer, config, today);
    y = draw_table_header(&writer, &cols, y);

    for (idx, row) in set.rows.iter().enumerate() {
        let description = format!(
            "{} {} {}",
            row.description, row.hs_code, row.unit_of_measure
        );
        let cells: [String; 12] = [
            (idx + 1).to_string(),
            row.recipient_name.clone(),
            row.invoice_number.clone(),
            row.export_reference.clone(),
            row.awb_number.clone(),
            description,
            format!("{:.2}", row.shipment_weight),
            row.quantity.to_string(),
            format!("{:.2}", row.unit_value),
            format!("{:.2}", row.invoice_value),
            // Placeholder tax columns, carried as fixed text
            "0".to_string(),
            "0.0".to_string(),
        ];
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .enumerate()
            .map(|(i, v)| wrap_text(v, 6.0, SUMMARY_COLUMNS[i] - 2.0))
            .collect();
        let height = (wrapped.iter().map(|c| c.len()).max().unwrap_or(1) as f64
            * line_height(6.0)
            + 2.5)
            .max(6.0);

        if y + height > BODY_LIMIT {
            writer.new_page();
            y = draw_page_header(&writer, config, today);
            y = draw_table_header(&writer, &cols, y);
        }

        for (i, cell) in wrapped.iter().enumerate() {
            let mut ty = y + line_height(6.0) + 0.8;
            for line in cell {
                writer.text(line, 6.0, cols[i] + 1.0, ty);
                ty += line_height(6.0);
            }
        }
        writer.grid(&cols, &[y, y + height]);
        y += height;
    }

    draw_footer(&mut writer, set, config, today, y + 6.0);

    writer.save(&output_dir.join(SUMMARY_FILENAME))?;
    info!(
        "Generated mother invoice: {} ({} rows)",
        SUMMARY_FILENAME,
        set.package_count()
    );
    Ok(SUMMARY_FILENAME.to_string())
}

fn column_bounds() -> Vec<f64> {
    let mut cols = vec![MARGIN];
    for width in SUMMARY_COLUMNS {
        cols.push(*cols.last().unwrap() + width);
    }
    cols
}

/// Title, shipper/consignee blocks, and the trade metadata panel.
/// Returns the y where the table may begin.
fn draw_page_header(w: &PageWriter, config: &AppConfig, today: NaiveDate) -> f64 {
    w.bold_text("Commercial Invoice cum Packing List", 11.0, MARGIN, 14.0);

    let top = 20.0;
    let col_width = (RIGHT - MARGIN) * 0.35;
    let shipper_x = MARGIN;
    let consignee_x = MARGIN + col_width;
    let panel_x = MARGIN + 2.0 * col_width;

    let shipper = &config.shipper;
    let mut y = top;
    w.bold_text("Shipper", 7.0, shipper_x, y);
    y += line_height(7.0) * 1.4;
    let shipper_address = shipper.address_lines.join(", ");
    let mut lines = vec![shipper.company.clone(), shipper.name.clone()];
    lines.extend(wrap_text(&shipper_address, 6.5, col_width - 4.0));
    lines.push(shipper.phone.clone());
    if !shipper.tax_id.is_empty() {
        lines.push(format!("GSTIN: {}", shipper.tax_id));
    }
    for line in &lines {
        w.text(line, 6.5, shipper_x, y);
        y += line_height(6.5);
    }
    let shipper_bottom = y;

    let consignee = &config.consignee;
    let mut y = top;
    w.bold_text("Consignee", 7.0, consignee_x, y);
    y += line_height(7.0) * 1.4;
    let consignee_address = consignee.address_lines.join(", ");
    let mut lines = vec![consignee.company.clone(), consignee.name.clone()];
    lines.extend(wrap_text(&consignee_address, 6.5, col_width - 4.0));
    lines.push(consignee.phone.clone());
    if !consignee.email.is_empty() {
        lines.push(consignee.email.clone());
    }
    for line in &lines {
        w.text(line, 6.5, consignee_x, y);
        y += line_height(6.5);
    }
    let consignee_bottom = y;

    // Key/value metadata panel; the invoice number carries the page number
    let trade = &config.trade;
    let invoice_no = format!(
        "{}/{}/{}",
        trade.sender_code,
        today.format("%d%m%Y"),
        w.page_number
    );
    let date_display = today.format("%d-%b-%Y").to_string();
    let pairs: [(&str, &str); 10] = [
        ("Invoice No:", invoice_no.as_str()),
        ("Date:", date_display.as_str()),
        ("Place of Receipt By Shipper:", &trade.place_of_receipt),
        ("City/Port Of Loading:", &trade.port_of_loading),
        ("City/Port of Discharge:", &trade.port_of_discharge),
        ("Reason for Export:", &trade.reason_for_export),
        ("Terms Of Trade:", &trade.terms_of_trade),
        ("Place of Supply:", &trade.place_of_supply),
        ("AD Code:", &trade.ad_code),
        ("IEC:", &trade.iec),
    ];
    let mut y = top;
    for (key, value) in pairs {
        w.bold_text(key, 6.5, panel_x, y);
        w.text_right(value, 6.5, RIGHT, y);
        y += line_height(6.5);
    }
    let panel_bottom = y;

    shipper_bottom.max(consignee_bottom).max(panel_bottom) + 4.0
}

/// Repeating bold table header row. Returns the y below it.
fn draw_table_header(w: &PageWriter, cols: &[f64], top: f64) -> f64 {
    let wrapped: Vec<Vec<String>> = SUMMARY_HEADERS
        .iter()
        .enumerate()
        .map(|(i, h)| wrap_text(h, 6.0, SUMMARY_COLUMNS[i] - 2.0))
        .collect();
    let height = wrapped.iter().map(|c| c.len()).max().unwrap_or(1) as f64 * line_height(6.0) + 2.5;
    for (i, cell) in wrapped.iter().enumerate() {
        let mut ty = top + line_height(6.0) + 0.8;
        for line in cell {
            w.bold_text(line, 6.0, cols[i] + 1.0, ty);
            ty += line_height(6.0);
        }
    }
    w.grid(cols, &[top, top + height]);
    top + height
}

/// Aggregate totals and signature, drawn once after the last data row.
fn draw_footer(
    w: &mut PageWriter,
    set: &InvoiceSet,
    config: &AppConfig,
    today: NaiveDate,
    top: f64,
) {
    let mut y = top;
    if y > BODY_LIMIT - 24.0 {
        w.new_page();
        y = draw_page_header(w, config, today) + 4.0;
    }

    let step = line_height(8.0) * 1.3;
    w.bold_text("Total Packages:", 8.0, MARGIN, y);
    w.text(&set.package_count().to_string(), 8.0, MARGIN + 38.0, y);
    w.bold_text("Total Invoice Value:", 8.0, MARGIN, y + step);
    w.text(&format!("{:.2}", set.total_value()), 8.0, MARGIN + 38.0, y + step);
    w.bold_text("Total Weight (Kg):", 8.0, MARGIN, y + 2.0 * step);
    w.text(
        &format!("{:.2}", set.total_weight()),
        8.0,
        MARGIN + 38.0,
        y + 2.0 * step,
    );
    w.bold_text("Currency:", 8.0, MARGIN, y + 3.0 * step);
    w.text(set.currency_code(), 8.0, MARGIN + 38.0, y + 3.0 * step);

    w.text_right(
        &format!("For {}", config.shipper.company),
        8.0,
        RIGHT,
        y + step,
    );
    w.text_right("Authorised Signatory", 8.0, RIGHT, y + 3.5 * step);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::create_default_config;
    use crate::invoice::{normalize, InvoiceSet};
    use crate::sheet::RawSheet;
    use chrono::NaiveDate;

    fn set_of(n: usize) -> InvoiceSet {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let mut set = InvoiceSet::default();
        for i in 0..n {
            let sheet = RawSheet {
                headers: vec![
                    "Invoice Number".into(),
                    "COMMODITY".into(),
                    "Invoice Value".into(),
                    "Total Shipment weight".into(),
                ],
                rows: vec![vec![
                    format!("INV{}", i + 1),
                    "Cotton fabric".into(),
                    "10.00".into(),
                    "0.50".into(),
                ]],
            };
            set.rows.push(normalize(&sheet.records().next().unwrap(), today));
        }
        set
    }

    #[test]
    fn test_compose_summary_writes_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_default_config();
        let name = compose_summary_document(&set_of(3), dir.path(), &config).unwrap();
        assert_eq!(name, SUMMARY_FILENAME);
        let bytes = std::fs::read(dir.path().join(name)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_compose_summary_tolerates_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_default_config();
        let name = compose_summary_document(&InvoiceSet::default(), dir.path(), &config).unwrap();
        assert!(dir.path().join(name).exists());
    }

    #[test]
    fn test_compose_summary_paginates_large_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_default_config();
        // Enough rows to force several pages; must not error
        compose_summary_document(&set_of(120), dir.path(), &config).unwrap();
        let bytes = std::fs::read(dir.path().join(SUMMARY_FILENAME)).unwrap();
        assert!(bytes.len() > 4_000);
    }
}
