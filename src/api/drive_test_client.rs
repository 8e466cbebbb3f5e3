//! Implements the `Drive` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Drive.

use crate::api::Drive;
use crate::error::Res;
use crate::model::{Cell, Table};
use crate::{utils, xlsx};
use anyhow::Context;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// An implementation of the `Drive` trait that does not use Google Drive. Spreadsheets are held as
/// `Table`s and exported as XLSX; files are held as bytes. Unknown IDs fail like a missing file
/// would. Every requested download is recorded, successful or not.
#[derive(Debug, Default, Clone)]
pub struct TestDrive {
    spreadsheets: HashMap<String, Table>,
    files: HashMap<String, Vec<u8>>,
    downloads: Vec<String>,
}

impl TestDrive {
    /// Create a new `TestDrive` holding `spreadsheets` and `files`, both keyed by ID.
    pub fn new(spreadsheets: HashMap<String, Table>, files: HashMap<String, Vec<u8>>) -> Self {
        Self {
            spreadsheets,
            files,
            downloads: Vec::new(),
        }
    }

    /// Create a `TestDrive` seeded with the survey data from this module, with the spreadsheet
    /// stored under `spreadsheet_id`.
    pub fn seeded(spreadsheet_id: &str) -> Res<Self> {
        let table = load_csv(SEED_SHEET, SURVEY_DATA)?;
        let files = SEED_PHOTOS
            .iter()
            .map(|id| (id.to_string(), fake_jpeg(id)))
            .collect();
        Ok(Self::new(
            HashMap::from([(spreadsheet_id.to_string(), table)]),
            files,
        ))
    }

    pub fn add_spreadsheet(&mut self, id: impl Into<String>, table: Table) {
        self.spreadsheets.insert(id.into(), table);
    }

    pub fn add_file(&mut self, id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(id.into(), bytes.into());
    }

    /// The file IDs passed to `download_file`, in order.
    pub fn downloads(&self) -> &[String] {
        &self.downloads
    }
}

#[async_trait::async_trait]
impl Drive for TestDrive {
    async fn export_spreadsheet(&mut self, spreadsheet_id: &str, destination: &Path) -> Res<()> {
        let table = self
            .spreadsheets
            .get(spreadsheet_id)
            .with_context(|| format!("Spreadsheet '{spreadsheet_id}' not found"))?;
        xlsx::write_table(destination, table)
    }

    async fn download_file(&mut self, file_id: &str, destination: &Path) -> Res<()> {
        self.downloads.push(file_id.to_string());
        let bytes = self
            .files
            .get(file_id)
            .with_context(|| format!("File '{file_id}' not found"))?;
        utils::write(destination, bytes).await
    }
}

/// Bytes that start like a JPEG and carry the file ID, so tests can tell files apart.
pub(crate) fn fake_jpeg(id: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(id.as_bytes());
    bytes
}

/// Loads a table from a CSV-formatted string. The first record is the header.
pub(crate) fn load_csv(sheet_name: &str, csv_data: &str) -> Res<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(header) => header
            .context("Unable to parse the CSV header")?
            .iter()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in records {
        let record = result.context("Unable to parse a CSV record")?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(Table::new(sheet_name, headers, rows))
}

const SEED_SHEET: &str = "Respuestas de formulario 1";

/// Photo IDs from `SURVEY_DATA` that exist in the seeded drive. `1MissingPhoto000` does not.
const SEED_PHOTOS: &[&str] = &[
    "1PozoFrontal0001",
    "1SitioFrontal001",
    "1PozoFrontal0002",
    "1PozoFrontal0003",
    "1Vandalismo00001",
];

/// Seed survey data. Two rows fall in November 2025, one in October 2025 and one in November 2024.
const SURVEY_DATA: &str = r##"Marca temporal,ID de Relevamiento,Pozo,Foto Vandalismo Pozo,Foto Frontal Pozo,Foto Frontal Sitio
2025-11-03 09:15:00,REL-0101,Pozo 12,,https://drive.google.com/open?id=1PozoFrontal0001,https://drive.google.com/file/d/1SitioFrontal001/view?usp=drivesdk
2025-11-18 14:40:00,REL-0102,Pozo 7,https://drive.google.com/open?id=1Vandalismo00001,https://drive.google.com/open?id=1PozoFrontal0002,https://drive.google.com/open?id=1MissingPhoto000
2025-10-29 11:05:00,REL-0098,Pozo 3,,https://drive.google.com/open?id=1PozoFrontal0003,
2024-11-12 08:00:00,REL-0011,Pozo 12,,sin foto,
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_csv() {
        let table = load_csv(SEED_SHEET, SURVEY_DATA).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.headers()[1], "ID de Relevamiento");
        assert_eq!(table.rows()[0].get(3), Some(&Cell::Empty));
        assert_eq!(table.rows()[3].get(4), Some(&Cell::text("sin foto")));
    }

    #[tokio::test]
    async fn test_export_and_download() {
        let dir = TempDir::new().unwrap();
        let mut drive = TestDrive::seeded("sheet-1").unwrap();

        let export = dir.path().join("export.xlsx");
        drive.export_spreadsheet("sheet-1", &export).await.unwrap();
        assert_eq!(xlsx::read_table(&export).unwrap().len(), 4);
        assert!(drive
            .export_spreadsheet("other", &dir.path().join("other.xlsx"))
            .await
            .is_err());

        let photo = dir.path().join("photo.jpg");
        drive
            .download_file("1PozoFrontal0001", &photo)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&photo).unwrap(), fake_jpeg("1PozoFrontal0001"));
        assert!(drive
            .download_file("1MissingPhoto000", &dir.path().join("missing.jpg"))
            .await
            .is_err());
        assert!(!dir.path().join("missing.jpg").exists());
        assert_eq!(drive.downloads(), ["1PozoFrontal0001", "1MissingPhoto000"]);
    }
}
