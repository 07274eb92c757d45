//! Child-invoice archive packaging.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::mother_invoice::SUMMARY_FILENAME;

/// Fixed archive name; prior runs are overwritten.
pub const ARCHIVE_FILENAME: &str = "child_invoices.zip";

/// Bundle the listed child invoices from `output_dir` into one zip archive.
/// Files that no longer exist are skipped; the summary document is never
/// included even if listed. Returns the archive filename.
pub fn package_archive(output_dir: &Path, filenames: &[String]) -> Result<String> {
    let zip_path = output_dir.join(ARCHIVE_FILENAME);
    let file =
        File::create(&zip_path).with_context(|| format!("Failed to create {:?}", zip_path))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for filename in filenames {
        if filename == SUMMARY_FILENAME {
            continue;
        }
        let path = output_dir.join(filename);
        if !path.exists() {
            warn!("Skipping missing file during packaging: {}", filename);
            continue;
        }
        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
        writer
            .start_file(filename.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", filename))?;
        writer.write_all(&bytes)?;
    }

    writer.finish().context("Failed to finish archive")?;
    info!("Created zip file: {}", ARCHIVE_FILENAME);
    Ok(ARCHIVE_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    fn entry_names(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_packages_existing_files_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-b").unwrap();

        let files = vec!["a.pdf".to_string(), "b.pdf".to_string()];
        let name = package_archive(dir.path(), &files).unwrap();
        assert_eq!(name, ARCHIVE_FILENAME);

        let mut names = entry_names(&dir.path().join(name));
        names.sort();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();

        let files = vec!["a.pdf".to_string(), "gone.pdf".to_string()];
        package_archive(dir.path(), &files).unwrap();
        assert_eq!(entry_names(&dir.path().join(ARCHIVE_FILENAME)), vec!["a.pdf"]);
    }

    #[test]
    fn test_never_includes_summary_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
        std::fs::write(dir.path().join(SUMMARY_FILENAME), b"%PDF-m").unwrap();

        // Passed explicitly and present on disk, still excluded
        let files = vec!["a.pdf".to_string(), SUMMARY_FILENAME.to_string()];
        package_archive(dir.path(), &files).unwrap();
        assert_eq!(entry_names(&dir.path().join(ARCHIVE_FILENAME)), vec!["a.pdf"]);
    }
}
