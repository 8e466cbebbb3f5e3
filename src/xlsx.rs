//! Reads and writes `Table`s as XLSX workbooks.
//!
//! Only the first worksheet is read. Its first row is the header, and every following row is data
//! up to the last row that has any value in it.

use crate::error::Res;
use crate::model::{from_excel_serial, to_excel_serial, Cell, Table};
use anyhow::Context;
use calamine::{open_workbook, DataType, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Number format applied to date-time cells in the output.
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Name used when the table does not carry a sheet name.
const DEFAULT_SHEET: &str = "Sheet1";

/// Reads the first worksheet of the workbook at `path`.
pub fn read_table(path: &Path) -> Res<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Unable to open workbook {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .with_context(|| format!("The workbook {} has no worksheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Missing sheet '{sheet_name}'"))?
        .with_context(|| format!("Unable to read sheet '{sheet_name}'"))?;

    // The range starts at the first used cell. Blank leading rows and columns are put back so
    // that columns and row numbers line up with the sheet as it is seen.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let width = start_col as usize + range.width();
    let blank_rows = std::iter::repeat_with(|| vec![Cell::Empty; width]).take(start_row as usize);
    let mut rows = blank_rows.chain(range.rows().map(|row| {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(to_cell));
        cells
    }));
    let headers: Vec<String> = match rows.next() {
        Some(first) => first
            .into_iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Cell::Empty => format!("Unnamed: {i}"),
                other => other.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let mut data: Vec<Vec<Cell>> = rows.collect();
    while data
        .last()
        .is_some_and(|row| row.iter().all(Cell::is_empty))
    {
        data.pop();
    }

    Ok(Table::new(sheet_name, headers, data))
}

/// Writes `table` as a single worksheet workbook at `path`, replacing any existing file.
pub fn write_table(path: &Path, table: &Table) -> Res<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_TIME_FORMAT);

    let worksheet = workbook.add_worksheet();
    let name = if table.sheet_name().is_empty() {
        DEFAULT_SHEET
    } else {
        table.sheet_name()
    };
    worksheet
        .set_name(name)
        .with_context(|| format!("Invalid sheet name '{name}'"))?;

    for (col, header) in table.headers().iter().enumerate() {
        worksheet
            .write_string(0, column_number(col)?, header)
            .with_context(|| format!("Unable to write header '{header}'"))?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(index + 1).context("Too many rows for a worksheet")?;
        for (col, cell) in row.cells().iter().enumerate() {
            let col = column_number(col)?;
            let result = match cell {
                Cell::Empty => continue,
                Cell::Text(s) => worksheet.write_string(row_number, col, s),
                Cell::Number(n) => worksheet.write_number(row_number, col, *n),
                Cell::Bool(b) => worksheet.write_boolean(row_number, col, *b),
                Cell::DateTime(dt) => worksheet.write_number_with_format(
                    row_number,
                    col,
                    to_excel_serial(dt),
                    &date_format,
                ),
            };
            result.with_context(|| {
                format!("Unable to write the cell at row {}, column {col}", row.number())
            })?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Unable to save workbook {}", path.display()))
}

fn column_number(col: usize) -> Res<u16> {
    u16::try_from(col).context("Too many columns for a worksheet")
}

fn to_cell(value: &DataType) -> Cell {
    match value {
        DataType::String(s) => Cell::text(s.as_str()),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Bool(b) => Cell::Bool(*b),
        DataType::DateTime(serial) => match from_excel_serial(*serial) {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Number(*serial),
        },
        DataType::Empty => Cell::Empty,
        other => Cell::text(other.to_string()),
    }
}
