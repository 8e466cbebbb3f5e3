use crate::model::Cell;
use std::fmt::{Display, Formatter};

/// The offset between a data row's index and the row number a person sees in the spreadsheet:
/// one for the header row and one because spreadsheet rows are numbered from 1.
const DISPLAY_ROW_OFFSET: usize = 2;

/// A worksheet: a header row and the data rows beneath it.
///
/// Rows are never removed from a table in place. `filter` produces a new table holding copies of
/// the rows that match, and each row keeps the display number it had in the source sheet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    sheet_name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates a table. Each data row is padded or cut to the width of `headers`, and numbered by
    /// its position.
    pub fn new(
        sheet_name: impl Into<String>,
        headers: Vec<String>,
        rows: impl IntoIterator<Item = Vec<Cell>>,
    ) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut cells)| {
                cells.resize(width, Cell::Empty);
                Row {
                    number: index + DISPLAY_ROW_OFFSET,
                    cells,
                }
            })
            .collect();
        Self {
            sheet_name: sheet_name.into(),
            headers,
            rows,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The position of the first column named `name`, if there is one.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns a copy of this table holding only the rows for which `keep` returns true.
    pub fn filter(&self, keep: impl Fn(&Row) -> bool) -> Table {
        Table {
            sheet_name: self.sheet_name.clone(),
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// One data row of a `Table`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    number: usize,
    cells: Vec<Cell>,
}

impl Row {
    /// The number of this row as shown in the source spreadsheet (the first data row is 2).
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell in column `column`, or `None` if the column is out of range.
    pub fn get(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Replaces the cell in column `column`. Out of range columns are ignored.
    pub fn set(&mut self, column: usize, cell: Cell) {
        if let Some(existing) = self.cells.get_mut(column) {
            *existing = cell;
        }
    }

    /// Identifies this row for naming downloaded files.
    ///
    /// When `id_column` is `Some` and this row has a non-empty value there, that value is used.
    /// Otherwise the row falls back to `row_{number}`.
    pub fn identifier(&self, id_column: Option<usize>) -> RowIdentifier {
        match id_column.and_then(|c| self.get(c)) {
            Some(cell) if !cell.is_empty() => RowIdentifier::Column(cell.to_string()),
            _ => RowIdentifier::Fallback(format!("row_{}", self.number)),
        }
    }
}

/// How a row was identified, see [`Row::identifier`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RowIdentifier {
    /// The value of the identifier column.
    Column(String),
    /// The synthetic `row_{N}` identifier.
    Fallback(String),
}

impl RowIdentifier {
    pub fn as_str(&self) -> &str {
        match self {
            RowIdentifier::Column(s) | RowIdentifier::Fallback(s) => s,
        }
    }
}

impl Display for RowIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            "Respuestas",
            vec!["ID".to_string(), "Foto".to_string()],
            vec![
                vec![Cell::text("REL-1"), Cell::text("a")],
                vec![Cell::Empty],
                vec![Cell::Number(7.0), Cell::text("c"), Cell::text("extra")],
            ],
        )
    }

    #[test]
    fn test_new_pads_and_numbers_rows() {
        let t = table();
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows()[0].number(), 2);
        assert_eq!(t.rows()[2].number(), 4);
        assert_eq!(t.rows()[1].cells(), &[Cell::Empty, Cell::Empty]);
        assert_eq!(t.rows()[2].cells().len(), 2);
    }

    #[test]
    fn test_filter_keeps_row_numbers() {
        let t = table();
        let filtered = t.filter(|r| r.number() != 3);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.rows()[1].number(), 4);
        assert_eq!(filtered.headers(), t.headers());
        // The source is untouched.
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_identifier() {
        let t = table();
        let id = t.column("ID");
        assert_eq!(
            t.rows()[0].identifier(id),
            RowIdentifier::Column("REL-1".to_string())
        );
        assert_eq!(
            t.rows()[1].identifier(id),
            RowIdentifier::Fallback("row_3".to_string())
        );
        assert_eq!(t.rows()[2].identifier(id).as_str(), "7");
        assert_eq!(t.rows()[0].identifier(None).to_string(), "row_2");
    }

    #[test]
    fn test_set() {
        let mut t = table();
        let col = t.column("Foto").unwrap();
        t.rows_mut()[0].set(col, Cell::text("/tmp/x.jpg"));
        t.rows_mut()[0].set(99, Cell::text("ignored"));
        assert_eq!(t.rows()[0].get(col), Some(&Cell::text("/tmp/x.jpg")));
    }
}
