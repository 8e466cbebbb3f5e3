//! The row processor: filters the exported survey to the target month, downloads the photos that
//! its rows link to and writes a copy of the table in which each resolved link is replaced by the
//! path of the downloaded file.

use crate::api::Drive;
use crate::error::{ErrorType, IntoResult};
use crate::model::{file_id, Cell, RowIdentifier, Table};
use crate::{naming, utils, xlsx, Config, Result};
use anyhow::Context;
use chrono::Datelike;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension given to every downloaded photo, whatever its actual format.
const PHOTO_EXTENSION: &str = "jpg";

/// What happened to one photo cell.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CellOutcome {
    /// The file was downloaded to this path.
    Downloaded(PathBuf),
    /// A file was already at this path, so nothing was downloaded.
    AlreadyPresent(PathBuf),
    /// No file ID could be found in the cell. The cell is left as it was.
    NoFileId,
    /// The download failed. The cell keeps its link.
    DownloadFailed,
}

/// Counters for one call to `process_data`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Rows that survived the date filter.
    pub rows: usize,
    pub downloaded: usize,
    pub already_present: usize,
    /// Non-empty photo cells that were kept because they hold no file ID.
    pub kept: usize,
    pub failed: usize,
}

impl Summary {
    fn count(&mut self, outcome: &CellOutcome) {
        match outcome {
            CellOutcome::Downloaded(_) => self.downloaded += 1,
            CellOutcome::AlreadyPresent(_) => self.already_present += 1,
            CellOutcome::NoFileId => self.kept += 1,
            CellOutcome::DownloadFailed => self.failed += 1,
        }
    }
}

/// The result of a successful call to `process_data`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ProcessOutcome {
    /// No row falls in the target month. Nothing was written.
    NoMatchingRows,
    /// The output spreadsheet was written to `path`.
    Written { path: PathBuf, summary: Summary },
}

/// The rows left after date filtering, and whether filtering happened at all.
enum DateFilter {
    Applied(Table),
    /// The sheet has no date column, so every row was kept.
    Skipped(Table),
}

/// Processes an exported survey spreadsheet into a report directory.
///
/// Photos are stored under `output_root`, one subdirectory per photo column, and the output
/// spreadsheet is written directly under `output_root` with a name derived from `output_stem`.
pub struct DataProcessor<'a> {
    config: &'a Config,
    output_root: PathBuf,
    output_stem: String,
    drive: &'a mut (dyn Drive + Send),
}

impl<'a> DataProcessor<'a> {
    /// Creates the processor along with a photo directory for each configured photo column.
    ///
    /// # Errors
    /// - Returns an `ErrorType::Directory` error if a photo directory cannot be created.
    pub async fn new(
        config: &'a Config,
        output_root: impl Into<PathBuf>,
        output_stem: impl Into<String>,
        drive: &'a mut (dyn Drive + Send),
    ) -> Result<Self> {
        let output_root = output_root.into();
        for column in config.photo_columns() {
            let folder = output_root.join(naming::sanitize_name(column));
            utils::make_dir(&folder)
                .await
                .pub_result(ErrorType::Directory)?;
            debug!("Photo directory for '{column}' is {}", folder.display());
        }
        Ok(Self {
            config,
            output_root,
            output_stem: output_stem.into(),
            drive,
        })
    }

    /// Reads the spreadsheet at `spreadsheet_path`, keeps the rows of the target month, resolves
    /// their photo cells and writes the result.
    ///
    /// Downloads are best-effort: a failed download is logged and its cell keeps the link.
    ///
    /// # Errors
    /// - `ErrorType::Read` if the spreadsheet cannot be read.
    /// - `ErrorType::Write` if the output spreadsheet cannot be written.
    pub async fn process_data(&mut self, spreadsheet_path: &Path) -> Result<ProcessOutcome> {
        let table = xlsx::read_table(spreadsheet_path)
            .context("Unable to read the exported spreadsheet")
            .pub_result(ErrorType::Read)?;
        debug!(
            "Read {} rows from sheet '{}'",
            table.len(),
            table.sheet_name()
        );

        let mut table = match self.filter_by_month(table) {
            DateFilter::Applied(table) if table.is_empty() => {
                info!(
                    "No rows found for {}/{}",
                    self.config.target_month(),
                    self.config.target_year()
                );
                return Ok(ProcessOutcome::NoMatchingRows);
            }
            DateFilter::Applied(table) | DateFilter::Skipped(table) => table,
        };

        let id_column = table.column(self.config.id_column());
        if id_column.is_none() {
            warn!(
                "The identifier column '{}' was not found, rows will be named by number",
                self.config.id_column()
            );
        }
        let photo_columns = self.photo_columns(&table);

        let mut summary = Summary {
            rows: table.len(),
            ..Summary::default()
        };
        for row in table.rows_mut() {
            info!("Processing row {}", row.number());
            let identifier = row.identifier(id_column);
            for (column, folder) in &photo_columns {
                let outcome = match row.get(*column) {
                    Some(cell) if !cell.is_empty() => {
                        self.resolve_cell(cell, &identifier, folder).await
                    }
                    _ => continue,
                };
                summary.count(&outcome);
                match outcome {
                    CellOutcome::Downloaded(path) | CellOutcome::AlreadyPresent(path) => {
                        row.set(*column, Cell::text(path.to_string_lossy()));
                    }
                    CellOutcome::NoFileId | CellOutcome::DownloadFailed => {}
                }
            }
        }

        let path = naming::unique_output_file(&self.output_root, &self.output_stem);
        xlsx::write_table(&path, &table)
            .context("Unable to write the output spreadsheet")
            .pub_result(ErrorType::Write)?;
        info!("Wrote {}", path.display());
        Ok(ProcessOutcome::Written { path, summary })
    }

    /// Keeps the rows whose date falls in the target month. Rows without a parsable date are
    /// dropped. If the table has no date column, every row is kept.
    fn filter_by_month(&self, table: Table) -> DateFilter {
        let Some(date_column) = table.column(self.config.date_column()) else {
            warn!(
                "The date column '{}' was not found, processing all rows",
                self.config.date_column()
            );
            return DateFilter::Skipped(table);
        };
        let month = self.config.target_month();
        let year = self.config.target_year();
        DateFilter::Applied(table.filter(|row| {
            row.get(date_column)
                .and_then(Cell::to_date)
                .is_some_and(|date| date.month() == month && date.year() == year)
        }))
    }

    /// The positions of the configured photo columns present in `table`, each with its folder.
    fn photo_columns(&self, table: &Table) -> Vec<(usize, PathBuf)> {
        let mut columns = Vec::new();
        for name in self.config.photo_columns() {
            match table.column(name) {
                Some(column) => {
                    columns.push((column, self.output_root.join(naming::sanitize_name(name))))
                }
                None => debug!("Photo column '{name}' is not in the sheet"),
            }
        }
        columns
    }

    async fn resolve_cell(
        &mut self,
        cell: &Cell,
        identifier: &RowIdentifier,
        folder: &Path,
    ) -> CellOutcome {
        let Some(file_id) = file_id(cell) else {
            debug!("No file ID in '{cell}' for {identifier}");
            return CellOutcome::NoFileId;
        };
        let path = folder.join(format!("{identifier}_{file_id}.{PHOTO_EXTENSION}"));
        if path.exists() {
            debug!("{} already exists", path.display());
            return CellOutcome::AlreadyPresent(path);
        }
        info!("Downloading {file_id} to {}", path.display());
        match self.drive.download_file(&file_id, &path).await {
            Ok(()) => CellOutcome::Downloaded(path),
            Err(e) => {
                warn!("Unable to download the photo {file_id} for {identifier}: {e:#}");
                CellOutcome::DownloadFailed
            }
        }
    }
}
