//! Per-upload generation pipeline.
//!
//! Normalizes every row, renders one child invoice per row, the consolidated
//! summary, and the archive. Row and packaging failures become warnings in the
//! report instead of aborting the run; only dataset-level problems surface as
//! errors.

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archive::package_archive;
use crate::child_invoice::compose_invoice_document;
use crate::config::AppConfig;
use crate::invoice::{self, InvoiceSet, COL_INVOICE_NUMBER, IDENTIFIER_COLUMNS};
use crate::mother_invoice::compose_summary_document;
use crate::sheet;

/// Failures that mean no documents can be generated at all.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Error reading the file: {0}")]
    Unreadable(String),
    #[error("Could not find any valid data in the uploaded file")]
    Empty,
}

/// One row of the result listing shown after generation.
#[derive(Debug, Clone, Serialize)]
pub struct RowListing {
    pub invoice_number: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_state: String,
    pub download_path: String,
}

/// Outcome of one upload: what was generated and what went wrong.
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerationReport {
    /// All generated filenames, sorted for display.
    pub files: Vec<String>,
    pub invoices: Vec<RowListing>,
    pub warnings: Vec<String>,
    pub mother_invoice: Option<String>,
    pub archive: Option<String>,
}

/// Remove everything from a previous run; the output directory belongs to one
/// in-flight request at a time.
pub fn clear_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Run the full pipeline for one uploaded file.
pub fn run(
    filename: &str,
    data: &[u8],
    config: &AppConfig,
) -> Result<GenerationReport, DatasetError> {
    let mut raw =
        sheet::parse_file(filename, data).map_err(|e| DatasetError::Unreadable(format!("{:#}", e)))?;
    raw.clean(COL_INVOICE_NUMBER, IDENTIFIER_COLUMNS);

    if raw.rows.is_empty() {
        return Err(DatasetError::Empty);
    }
    info!("Processing {} rows from {}", raw.rows.len(), filename);

    let today = Local::now().date_naive();
    let set = InvoiceSet {
        rows: raw
            .records()
            .map(|record| invoice::normalize(&record, today))
            .collect(),
    };

    let output_dir = &config.output_dir;
    let mut report = GenerationReport::default();
    let mut child_files = Vec::new();

    for row in &set.rows {
        match compose_invoice_document(row, output_dir, config) {
            Ok(generated) => {
                report.invoices.push(RowListing {
                    invoice_number: row.invoice_number.clone(),
                    recipient_name: row.recipient_name.clone(),
                    recipient_phone: row.recipient_phone.clone(),
                    recipient_state: row.recipient_state.clone(),
                    download_path: format!("/invoices/{}", generated),
                });
                child_files.push(generated);
            }
            Err(e) => {
                let inv = if row.invoice_number.is_empty() {
                    "Unknown"
                } else {
                    row.invoice_number.as_str()
                };
                warn!("Could not generate invoice {}: {:#}", inv, e);
                report
                    .warnings
                    .push(format!("Could not generate invoice {}. Error: {:#}", inv, e));
            }
        }
    }

    report.files.extend(child_files.iter().cloned());

    if !child_files.is_empty() {
        match package_archive(output_dir, &child_files) {
            Ok(name) => {
                report.files.push(name.clone());
                report.archive = Some(name);
            }
            Err(e) => {
                error!("Could not create zip file: {:#}", e);
                report
                    .warnings
                    .push(format!("Could not create zip file. Error: {:#}", e));
            }
        }
    }

    // The summary covers all rows, independent of per-row PDF success
    match compose_summary_document(&set, output_dir, config) {
        Ok(name) => {
            report.files.push(name.clone());
            report.mother_invoice = Some(name);
        }
        Err(e) => {
            error!("Could not generate mother invoice: {:#}", e);
            report
                .warnings
                .push(format!("Could not generate mother invoice. Error: {:#}", e));
        }
    }

    report.files.sort();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ARCHIVE_FILENAME;
    use crate::config::create_default_config;
    use crate::mother_invoice::SUMMARY_FILENAME;

    fn test_config(dir: &Path) -> AppConfig {
        let mut config = create_default_config();
        config.output_dir = dir.to_path_buf();
        config
    }

    const CSV: &str = "\
Invoice Number,House AWB No.,Recipient_Contact Name,COMMODITY,HS CODE 1,Invoice Value,Total Shipment weight,CURRENCY
INV1,AWB001,Alice,Cotton fabric,52081000,100.00,1.5,USD-US Dollar
INV2,AWB002,Bob,Silk scarf,,50.25,0.75,USD-US Dollar
INV3,N/A,Carol,Linen towels,63026000,,2.0,USD-US Dollar
";

    #[test]
    fn test_end_to_end_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        clear_output_dir(&config.output_dir).unwrap();

        let report = run("upload.csv", CSV.as_bytes(), &config).unwrap();

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.invoices.len(), 3);
        assert_eq!(report.mother_invoice.as_deref(), Some(SUMMARY_FILENAME));
        assert_eq!(report.archive.as_deref(), Some(ARCHIVE_FILENAME));

        // 3 child PDFs + summary + archive, sorted for display
        assert_eq!(report.files.len(), 5);
        let mut sorted = report.files.clone();
        sorted.sort();
        assert_eq!(report.files, sorted);

        for name in ["AWB001.pdf", "AWB002.pdf", "invoice_INV3.pdf"] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }
        assert!(dir.path().join(SUMMARY_FILENAME).exists());
        assert!(dir.path().join(ARCHIVE_FILENAME).exists());
    }

    #[test]
    fn test_row_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        clear_output_dir(&config.output_dir).unwrap();
        // A directory squatting on row 2's output name makes its write fail
        std::fs::create_dir(dir.path().join("AWB002.pdf")).unwrap();

        let report = run("upload.csv", CSV.as_bytes(), &config).unwrap();

        assert_eq!(report.invoices.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("INV2"), "{}", report.warnings[0]);

        // The archive holds the two successful child invoices
        let archive_file =
            std::fs::File::open(dir.path().join(ARCHIVE_FILENAME)).unwrap();
        let archive = zip::ZipArchive::new(archive_file).unwrap();
        assert_eq!(archive.len(), 2);

        // The summary still covers all 3 rows
        assert_eq!(report.mother_invoice.as_deref(), Some(SUMMARY_FILENAME));
    }

    #[test]
    fn test_rows_without_invoice_number_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        clear_output_dir(&config.output_dir).unwrap();

        let csv = "Invoice Number,COMMODITY\nINV1,Fabric\n,Orphan row\n";
        let report = run("upload.csv", csv.as_bytes(), &config).unwrap();
        assert_eq!(report.invoices.len(), 1);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        clear_output_dir(&config.output_dir).unwrap();

        let csv = "Invoice Number,COMMODITY\n,no invoice number\n";
        let err = run("upload.csv", csv.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let err = run("upload.txt", b"whatever", &config).unwrap_err();
        assert!(matches!(err, DatasetError::Unreadable(_)));
    }

    #[test]
    fn test_clear_output_dir_removes_prior_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.pdf");
        std::fs::write(&stale, b"old").unwrap();
        clear_output_dir(dir.path()).unwrap();
        assert!(!stale.exists());
    }
}
