//! Local CSV file as a row source.
//!
//! The first record is the header. Rows may have fewer than four fields.

use crate::client::{RowSource, descending_unique};
use crate::models::{AnkisyncError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// CSV-backed row source.
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Every record in the file, header included.
    fn read_records(&self) -> Result<Vec<csv::StringRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnkisyncError::from)
    }

    /// Replace the file contents with `records` via a temp file.
    fn write_records(&self, records: &[csv::StringRecord]) -> Result<()> {
        let temp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&temp_path)?;
            for record in records {
                writer.write_record(record)?;
            }
            writer
                .flush()
                .map_err(|e| AnkisyncError::io("flushing csv", e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| AnkisyncError::io("replacing csv", e))
    }
}

#[async_trait]
impl RowSource for CsvSheet {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let rows: Vec<Vec<String>> = self
            .read_records()?
            .into_iter()
            .skip(1)
            .map(|record| record.iter().map(str::to_string).collect())
            .collect();

        if rows.is_empty() {
            warn!(path = %self.path.display(), "No data found in CSV file");
        } else {
            info!(rows = rows.len(), path = %self.path.display(), "Read rows from CSV file");
        }
        Ok(rows)
    }

    async fn delete_rows(&self, rows: &[usize]) -> Result<()> {
        if rows.contains(&0) {
            return Err(AnkisyncError::InvalidInput(
                "Refusing to delete the header row".to_string(),
            ));
        }

        let mut records = self.read_records()?;
        let mut deleted = 0usize;

        for row in descending_unique(rows) {
            if row < records.len() {
                records.remove(row);
                deleted += 1;
            } else {
                warn!(row, records = records.len(), "Row to delete is past the end of the file");
            }
        }

        self.write_records(&records)?;
        info!(count = deleted, path = %self.path.display(), "Deleted rows from CSV file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHEET: &str = "German,Turkish,Russian,English\nHaus,ev,,house\nBaum\n,,дом,home\nKatze,kedi,кошка,cat\n";

    fn sheet_in(dir: &TempDir) -> CsvSheet {
        let path = dir.path().join("words.csv");
        fs::write(&path, SHEET).unwrap();
        CsvSheet::new(&path)
    }

    #[tokio::test]
    async fn test_read_rows_skips_header_and_keeps_short_rows() {
        let temp_dir = TempDir::new().unwrap();
        let rows = sheet_in(&temp_dir).read_rows().await.unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Haus", "ev", "", "house"]);
        assert_eq!(rows[1], vec!["Baum"]);
        assert_eq!(rows[2], vec!["", "", "дом", "home"]);
    }

    #[tokio::test]
    async fn test_delete_rows_removes_positions_without_shifting() {
        let temp_dir = TempDir::new().unwrap();
        let sheet = sheet_in(&temp_dir);

        // Positions count the header as 0: 1 is "Haus", 3 is "дом".
        sheet.delete_rows(&[1, 3]).await.unwrap();

        let rows = sheet.read_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Baum"]);
        assert_eq!(rows[1], vec!["Katze", "kedi", "кошка", "cat"]);
        let content = fs::read_to_string(temp_dir.path().join("words.csv")).unwrap();
        assert!(content.starts_with("German,Turkish,Russian,English\n"));
    }

    #[tokio::test]
    async fn test_delete_rows_ignores_out_of_range() {
        let temp_dir = TempDir::new().unwrap();
        let sheet = sheet_in(&temp_dir);

        sheet.delete_rows(&[4, 42]).await.unwrap();
        assert_eq!(sheet.read_rows().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_header_cannot_be_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let sheet = sheet_in(&temp_dir);

        assert!(matches!(
            sheet.delete_rows(&[0, 1]).await,
            Err(AnkisyncError::InvalidInput(_))
        ));
        assert_eq!(sheet.read_rows().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let sheet = CsvSheet::new(&temp_dir.path().join("absent.csv"));
        assert!(matches!(sheet.read_rows().await, Err(AnkisyncError::Csv(_))));
    }
}
