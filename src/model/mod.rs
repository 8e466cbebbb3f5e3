//! Types that represent the data model: a spreadsheet `Table` made of `Row`s of `Cell`s, plus the
//! helpers that read Drive file IDs and dates out of cells.
mod cell;
mod file_id;
mod table;

pub use cell::{from_excel_serial, parse_date_text, to_excel_serial, Cell};
pub use file_id::{file_id, file_id_from_url};
pub use table::{Row, RowIdentifier, Table};
