//! Single-shipment ("child") invoice composer.
//!
//! Fixed layout, top to bottom: header grid (title, carrier AWB, export and
//! invoice references), shipper/consignee/importer party blocks, a one-line
//! commodity table, and the declaration/totals footer.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::invoice::{derive_filename, NormalizedInvoiceRow};
use crate::pdf::{line_height, wrap_text, PageWriter, MARGIN, PAGE_WIDTH};

const RIGHT: f64 = PAGE_WIDTH - MARGIN;

// Item table column widths in mm, left to right (sums to the content width).
const ITEM_COLUMNS: [f64; 10] = [10.0, 50.0, 20.0, 20.0, 18.0, 15.0, 10.0, 12.0, 17.0, 18.0];

const ITEM_HEADERS: [&str; 10] = [
    "S.NO",
    "FULL DESCRIPTION OF GOODS",
    "STATE OF ORIGIN GOODS",
    "HS CODE",
    "COUNTRY OF MFG",
    "NET WGT KG",
    "QTY",
    "UOM",
    "UNIT VALUE",
    "TOTAL VALUE",
];

/// Render one child invoice into `output_dir`. Returns the derived filename.
pub fn compose_invoice_document(
    row: &NormalizedInvoiceRow,
    output_dir: &Path,
    config: &AppConfig,
) -> Result<String> {
    let filename = derive_filename(&row.awb_number, &row.invoice_number);
    let mut writer = PageWriter::new("Commercial Invoice")?;

    let mut y = draw_header(&writer, row);
    y = draw_parties(&writer, row, config, y + 3.0);
    y = draw_item_table(&mut writer, row, y + 4.0);
    draw_footer(&mut writer, row, config, y + 5.0);

    writer.save(&output_dir.join(&filename))?;
    info!("Generated individual invoice: {}", filename);
    Ok(filename)
}

/// Header grid. Returns the y below the block.
fn draw_header(w: &PageWriter, row: &NormalizedInvoiceRow) -> f64 {
    let top = 12.0;
    let title_bottom = top + 12.0;
    let row2 = title_bottom + 8.0;
    let bottom = row2 + 8.0;
    let quarter = (RIGHT - MARGIN) / 4.0;
    let cols = [
        MARGIN,
        MARGIN + quarter,
        MARGIN + 2.0 * quarter,
        MARGIN + 3.0 * quarter,
        RIGHT,
    ];

    // Title row: title spans the middle, carrier AWB label on the right
    w.bold_text("COMMERCIAL INVOICE", 11.0, cols[1] + 4.0, top + 7.5);
    w.bold_text("FedEx INTERNATIONAL AIRWAYBILL", 6.5, cols[3] + 2.0, top + 4.5);
    w.bold_text(&row.awb_number, 8.0, cols[3] + 2.0, top + 9.5);

    w.hline(MARGIN, RIGHT, top);
    w.hline(MARGIN, RIGHT, title_bottom);
    w.vline(MARGIN, top, title_bottom);
    w.vline(cols[1], top, title_bottom);
    w.vline(cols[3], top, title_bottom);
    w.vline(RIGHT, top, title_bottom);

    // Two reference rows on a full four-column grid
    w.bold_text("DATE OF EXPORT", 7.0, cols[0] + 2.0, title_bottom + 5.5);
    w.text(&row.invoice_date, 8.0, cols[1] + 2.0, title_bottom + 5.5);
    w.bold_text("EXPORT REFERENCES", 7.0, cols[2] + 2.0, title_bottom + 5.5);
    w.text(&row.export_reference, 8.0, cols[3] + 2.0, title_bottom + 5.5);

    w.bold_text("INVOICE NUMBER", 7.0, cols[0] + 2.0, row2 + 5.5);
    w.text(&row.invoice_number, 8.0, cols[1] + 2.0, row2 + 5.5);
    w.bold_text("INVOICE DATE", 7.0, cols[2] + 2.0, row2 + 5.5);
    w.text(&row.invoice_date, 8.0, cols[3] + 2.0, row2 + 5.5);

    w.grid(&cols, &[title_bottom, row2, bottom]);
    bottom
}

/// One labelled party block; returns the y below the last printed line.
fn draw_party_block(w: &PageWriter, label: &str, lines: &[String], x: f64, mut y: f64) -> f64 {
    w.bold_text(label, 7.0, x, y);
    y += line_height(7.0) * 1.6;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        w.text(line, 7.0, x, y);
        y += line_height(7.0);
    }
    y
}

fn draw_parties(w: &PageWriter, row: &NormalizedInvoiceRow, config: &AppConfig, top: f64) -> f64 {
    let mid = MARGIN + (RIGHT - MARGIN) / 2.0;

    let shipper = &config.shipper;
    let mut shipper_lines = vec![shipper.name.clone(), shipper.company.clone()];
    shipper_lines.extend(shipper.address_lines.iter().cloned());
    shipper_lines.push(format!("TEL: {}", shipper.phone));
    if !shipper.tax_id.is_empty() {
        shipper_lines.push(format!("SHIPPER'S TAX NUMBER: {}", shipper.tax_id));
    }
    let shipper_bottom = draw_party_block(w, "SHIPPER/EXPORTER", &shipper_lines, MARGIN, top);

    let consignee = &config.consignee;
    let mut consignee_lines = vec![consignee.name.clone(), consignee.company.clone()];
    consignee_lines.extend(consignee.address_lines.iter().cloned());
    consignee_lines.push(format!("TEL: {}", consignee.phone));
    let consignee_bottom =
        draw_party_block(w, "RECIPIENT/CONSIGNEE", &consignee_lines, mid + 2.0, top);

    let mut importer_lines = vec![row.recipient_name.clone()];
    importer_lines.extend(row.recipient_address_lines());
    importer_lines.push(format!("TEL: {}", row.recipient_phone));
    importer_lines.push(format!("EMAIL: {}", row.recipient_email));
    let importer_bottom = draw_party_block(
        w,
        "IMPORTER OTHER THAN C/NEE OR BILL TO PARTY",
        &importer_lines,
        mid + 2.0,
        consignee_bottom + 4.0,
    );

    shipper_bottom.max(importer_bottom)
}

/// The single-commodity line-item table. Returns the y below the table.
fn draw_item_table(w: &mut PageWriter, row: &NormalizedInvoiceRow, top: f64) -> f64 {
    let mut cols = vec![MARGIN];
    for width in ITEM_COLUMNS {
        cols.push(*cols.last().unwrap() + width);
    }

    // Header row, wrapped at 6pt
    let header_cells: Vec<Vec<String>> = ITEM_HEADERS
        .iter()
        .enumerate()
        .map(|(i, h)| wrap_text(h, 6.0, ITEM_COLUMNS[i] - 2.0))
        .collect();
    let header_height = header_cells
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(1) as f64
        * line_height(6.0)
        + 3.0;
    for (i, cell) in header_cells.iter().enumerate() {
        let mut ty = top + line_height(6.0) + 1.0;
        for line in cell {
            w.bold_text(line, 6.0, cols[i] + 1.0, ty);
            ty += line_height(6.0);
        }
    }

    let data: [String; 10] = [
        "1".to_string(),
        row.description.clone(),
        row.origin_state.clone(),
        row.hs_code.clone(),
        row.manufacture_country.clone(),
        format!("{:.2}", row.net_weight),
        row.quantity.to_string(),
        row.unit_of_measure.clone(),
        format!("{:.2}", row.unit_value),
        format!("{:.2}", row.invoice_value),
    ];
    let data_cells: Vec<Vec<String>> = data
        .iter()
        .enumerate()
        .map(|(i, v)| wrap_text(v, 7.0, ITEM_COLUMNS[i] - 2.0))
        .collect();
    let data_top = top + header_height;
    let data_height = (data_cells.iter().map(|c| c.len()).max().unwrap_or(1) as f64
        * line_height(7.0)
        + 3.0)
        .max(8.0);
    for (i, cell) in data_cells.iter().enumerate() {
        let mut ty = data_top + line_height(7.0) + 1.0;
        for line in cell {
            w.text(line, 7.0, cols[i] + 1.0, ty);
            ty += line_height(7.0);
        }
    }

    let bottom = data_top + data_height;
    w.grid(&cols, &[top, data_top, bottom]);
    bottom
}

fn draw_footer(w: &mut PageWriter, row: &NormalizedInvoiceRow, config: &AppConfig, top: f64) {
    let label_right = RIGHT - 25.0;
    let step = 6.0;

    w.bold_text_right("TOTAL", 8.0, label_right, top);
    w.text_right(&format!("{:.2}", row.invoice_value), 8.0, RIGHT, top);

    w.bold_text(
        &format!("CURRENCY IN WORDS: {}", row.currency_code),
        7.0,
        MARGIN,
        top + step,
    );
    w.bold_text_right("TOTAL FREIGHT CHARGES", 8.0, label_right, top + step);
    w.text_right(&format!("{:.2}", row.freight_charges), 8.0, RIGHT, top + step);

    w.bold_text_right(
        &format!("TOTAL INVOICE AMOUNT {}", row.currency_code),
        8.0,
        label_right,
        top + 2.0 * step,
    );
    w.text_right(
        &format!("{:.2}", row.total_invoice_amount()),
        8.0,
        RIGHT,
        top + 2.0 * step,
    );

    let mut y = top + 2.0 * step;
    for line in wrap_text(
        "I DECLARE ALL THE INFORMATION CONTAINED IN THIS INVOICE IS TRUE AND CORRECT TO THE BEST OF MY KNOWLEDGE.",
        7.0,
        95.0,
    ) {
        w.text(&line, 7.0, MARGIN, y);
        y += line_height(7.0);
    }

    y += 4.0;
    w.bold_text("NAME (PLEASE PRINT)", 7.0, MARGIN, y);
    w.text(&config.shipper.company, 7.0, MARGIN + 32.0, y);
    w.text(&config.shipper.name, 7.0, MARGIN, y + 12.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::create_default_config;
    use crate::invoice::normalize;
    use crate::sheet::RawSheet;
    use chrono::NaiveDate;

    fn sample_row() -> NormalizedInvoiceRow {
        let sheet = RawSheet {
            headers: vec![
                "Invoice Number".into(),
                "House AWB No.".into(),
                "COMMODITY".into(),
                "Invoice Value".into(),
                "Freight_charges".into(),
            ],
            rows: vec![vec![
                "INV1".into(),
                "123/456".into(),
                "Hand woven cotton fabric, assorted colours".into(),
                "120.50".into(),
                "9.25".into(),
            ]],
        };
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let row = normalize(&sheet.records().next().unwrap(), today);
        row
    }

    #[test]
    fn test_compose_writes_pdf_with_derived_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_default_config();
        let filename = compose_invoice_document(&sample_row(), dir.path(), &config).unwrap();
        assert_eq!(filename, "123_456.pdf");

        let bytes = std::fs::read(dir.path().join(&filename)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
