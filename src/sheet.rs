//! Tabular ingestion for CSV and Excel (.xlsx/.xlsm/.xls) upload files.
//!
//! Excel workbooks are filtered to sheets whose name contains
//! "recipient and invoice data"; matching sheets are concatenated into one
//! dataset. CSV files are taken whole.

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use std::io::Cursor;

/// Substring an Excel sheet name must contain (case-insensitively) to be ingested.
const SHEET_NAME_FILTER: &str = "recipient and invoice data";

/// Raw parsed sheet data. Read-only after load.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A borrowed view over one row, with access by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> RawRecord<'a> {
    /// Look up a cell by column name. Returns `None` for missing columns,
    /// short rows, and blank cells.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        let cell = self.cells.get(idx)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }
}

impl RawSheet {
    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        self.rows.iter().map(|cells| RawRecord {
            headers: &self.headers,
            cells,
        })
    }

    /// Drop rows with no value in `key_column`, then strip a trailing literal
    /// ".0" from the named text columns. The ".0" strip is a narrow fix for
    /// spreadsheet float artifacts on identifier-like fields, not a general
    /// number formatter.
    pub fn clean(&mut self, key_column: &str, text_columns: &[&str]) {
        let key_idx = self.headers.iter().position(|h| h == key_column);
        if let Some(idx) = key_idx {
            self.rows
                .retain(|row| row.get(idx).map(|c| !c.trim().is_empty()).unwrap_or(false));
        }

        for name in text_columns {
            let Some(idx) = self.headers.iter().position(|h| h == name) else {
                continue;
            };
            for row in &mut self.rows {
                if let Some(cell) = row.get_mut(idx) {
                    if let Some(stripped) = cell.strip_suffix(".0") {
                        *cell = stripped.to_string();
                    }
                }
            }
        }
    }
}

/// Dispatch file parsing by extension.
pub fn parse_file(filename: &str, data: &[u8]) -> Result<RawSheet> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "csv" => parse_csv(data),
        "xlsx" | "xlsm" => parse_excel::<Xlsx<_>>(data),
        "xls" => parse_excel::<Xls<_>>(data),
        _ => anyhow::bail!(
            "Unsupported file type: .{}. Supported: .csv, .xls, .xlsx, .xlsm",
            ext
        ),
    }
}

/// Parse a CSV file into a single RawSheet.
fn parse_csv(data: &[u8]) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        anyhow::bail!("CSV file has no headers");
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(RawSheet { headers, rows })
}

/// Parse an Excel workbook. Sheets matching the name filter are concatenated;
/// headers come from the first matching sheet.
fn parse_excel<R>(data: &[u8]) -> Result<RawSheet>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    let cursor = Cursor::new(data.to_vec());
    let mut workbook: R = open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut merged: Option<RawSheet> = None;

    for name in &sheet_names {
        if !name.to_lowercase().contains(SHEET_NAME_FILTER) {
            continue;
        }
        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        let Some(sheet) = range_to_raw_sheet(&range) else {
            continue;
        };

        match merged.as_mut() {
            Some(m) => m.rows.extend(sheet.rows),
            None => merged = Some(sheet),
        }
    }

    merged.ok_or_else(|| {
        anyhow::anyhow!("No sheets named 'Recipient and Invoice Data' found in the Excel file")
    })
}

/// Convert a calamine Range into a RawSheet. First row = headers.
/// Returns None for sheets that are empty or header-only.
fn range_to_raw_sheet(range: &calamine::Range<Data>) -> Option<RawSheet> {
    let mut row_iter = range.rows();

    let header_row = row_iter.next()?;
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return None;
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let values: Vec<String> = row.iter().map(cell_to_string).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(values);
    }

    Some(RawSheet { headers, rows })
}

/// Convert a calamine cell to a string representation.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Avoid trailing ".0" for whole numbers
            if *f == (*f as i64) as f64 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let csv_data = b"Invoice Number,COMMODITY\nINV1,Cotton fabric\nINV2,Silk scarf\n";
        let sheet = parse_file("upload.csv", csv_data).unwrap();
        assert_eq!(sheet.headers, vec!["Invoice Number", "COMMODITY"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["INV1", "Cotton fabric"]);
    }

    #[test]
    fn test_parse_csv_skips_blank_rows() {
        let csv_data = b"a,b\n1,2\n,\n3,4\n";
        let sheet = parse_file("f.csv", csv_data).unwrap();
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = parse_file("upload.txt", b"data");
        assert!(result.is_err());
    }

    #[test]
    fn test_record_field_lookup() {
        let sheet = RawSheet {
            headers: vec!["Invoice Number".into(), "CURRENCY".into()],
            rows: vec![vec!["INV1".into(), "  ".into()]],
        };
        let rec = sheet.records().next().unwrap();
        assert_eq!(rec.field("Invoice Number"), Some("INV1"));
        assert_eq!(rec.field("CURRENCY"), None); // blank cell
        assert_eq!(rec.field("Missing Column"), None);
    }

    #[test]
    fn test_clean_drops_keyless_rows_and_strips_float_suffix() {
        let mut sheet = RawSheet {
            headers: vec!["Invoice Number".into(), "Recipient_Postal code".into()],
            rows: vec![
                vec!["INV1.0".into(), "80241.0".into()],
                vec!["".into(), "11111".into()],
                vec!["INV2".into(), "90210".into()],
            ],
        };
        sheet.clean("Invoice Number", &["Invoice Number", "Recipient_Postal code"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["INV1", "80241"]);
        assert_eq!(sheet.rows[1], vec!["INV2", "90210"]);
    }

    #[test]
    fn test_clean_without_key_column_keeps_rows() {
        let mut sheet = RawSheet {
            headers: vec!["a".into()],
            rows: vec![vec!["1".into()]],
        };
        sheet.clean("Invoice Number", &[]);
        assert_eq!(sheet.rows.len(), 1);
    }
}
