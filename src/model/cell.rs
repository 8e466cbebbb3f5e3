use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt::{Display, Formatter};

/// Excel counts days from 1899-12-30 (which absorbs the 1900 leap year bug for modern dates).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// The largest serial Excel can represent, 9999-12-31.
const EXCEL_MAX_SERIAL: f64 = 2_958_466.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Layouts tried, in order, when a text cell is parsed as a date-time.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Layouts tried, in order, when a text cell is parsed as a date.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// The value of one spreadsheet cell.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Creates a text cell. An empty string becomes `Cell::Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Returns the string if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Interprets the cell as a calendar date.
    ///
    /// Date-time cells are used as-is. Numbers are treated as Excel serial dates. Text is tried
    /// against ISO, month-first and day-first layouts in that order. Anything else, or anything
    /// that does not parse, is `None`.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::DateTime(dt) => Some(dt.date()),
            Cell::Number(serial) => from_excel_serial(*serial).map(|dt| dt.date()),
            Cell::Text(s) => parse_date_text(s),
            Cell::Empty | Cell::Bool(_) => None,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Converts an Excel serial date (days since 1899-12-30, fractional part is the time of day).
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * SECONDS_PER_DAY).round() as i64;
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Converts a date-time to an Excel serial date.
pub fn to_excel_serial(dt: &NaiveDateTime) -> f64 {
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (*dt - epoch).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Parses the textual form of a date or date-time.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_text_constructor() {
        assert_eq!(Cell::text(""), Cell::Empty);
        assert_eq!(Cell::text("x"), Cell::Text("x".to_string()));
    }

    #[test]
    fn test_excel_serial() {
        // 45976.5 is 2025-11-15 12:00:00
        let dt = from_excel_serial(45976.5).unwrap();
        assert_eq!(dt.date(), ymd(2025, 11, 15));
        assert_eq!(dt.format("%H:%M:%S").to_string(), "12:00:00");
        assert_eq!(to_excel_serial(&dt), 45976.5);
        assert!(from_excel_serial(-1.0).is_none());
        assert!(from_excel_serial(f64::NAN).is_none());
    }

    #[test]
    fn test_parse_date_text() {
        assert_eq!(parse_date_text("2025-11-03"), Some(ymd(2025, 11, 3)));
        assert_eq!(
            parse_date_text("2025-11-03 14:05:00"),
            Some(ymd(2025, 11, 3))
        );
        assert_eq!(
            parse_date_text("2025-11-03T14:05:00Z"),
            Some(ymd(2025, 11, 3))
        );
        // Month first when ambiguous.
        assert_eq!(parse_date_text("11/3/2025"), Some(ymd(2025, 11, 3)));
        assert_eq!(
            parse_date_text("11/3/2025 9:15:30"),
            Some(ymd(2025, 11, 3))
        );
        // Day first when month first is impossible.
        assert_eq!(parse_date_text("25/11/2025"), Some(ymd(2025, 11, 25)));
        assert_eq!(parse_date_text("not a date"), None);
        assert_eq!(parse_date_text("  "), None);
    }

    #[test]
    fn test_to_date() {
        let dt = ymd(2025, 11, 5).and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(Cell::DateTime(dt).to_date(), Some(ymd(2025, 11, 5)));
        assert_eq!(Cell::Number(45976.0).to_date(), Some(ymd(2025, 11, 15)));
        assert_eq!(Cell::text("2024-02-29").to_date(), Some(ymd(2024, 2, 29)));
        assert_eq!(Cell::text("garbage").to_date(), None);
        assert_eq!(Cell::Bool(true).to_date(), None);
        assert_eq!(Cell::Empty.to_date(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Cell::Number(1042.0).to_string(), "1042");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::text("REL-7").to_string(), "REL-7");
        assert_eq!(Cell::Empty.to_string(), "");
    }
}
