//! Collision-free names for the report directory, the output spreadsheet and the per-column photo
//! folders.
//!
//! Uniqueness is found by linear probing: `name`, `name2`, `name3`, ... The first unused candidate
//! is returned. Nothing is created here, so calling a function twice before creating the returned
//! path yields the same candidate. This is check-then-create and assumes a single running instance.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The extension of the output spreadsheet.
pub const XLSX: &str = "xlsx";

/// Returns `base/name` if nothing exists there, otherwise the first of `base/name2`, `base/name3`,
/// ... that does not exist.
pub fn unique_folder(base: impl AsRef<Path>, name: &str) -> PathBuf {
    let base = base.as_ref();
    first_unused(|suffix| base.join(format!("{name}{suffix}")))
}

/// Returns `base/name.xlsx` if nothing exists there, otherwise the first of `base/name2.xlsx`,
/// `base/name3.xlsx`, ... that does not exist.
pub fn unique_output_file(base: impl AsRef<Path>, name: &str) -> PathBuf {
    let base = base.as_ref();
    first_unused(|suffix| base.join(format!("{name}{suffix}.{XLSX}")))
}

/// Probes candidates with suffixes "", "2", "3", ... and returns the first path that does not
/// exist.
fn first_unused(candidate: impl Fn(&str) -> PathBuf) -> PathBuf {
    let first = candidate("");
    if !first.exists() {
        return first;
    }
    let mut counter: u32 = 2;
    loop {
        let path = candidate(&counter.to_string());
        if !path.exists() {
            return path;
        }
        counter += 1;
    }
}

/// Turns a column header into a folder name.
///
/// Every character that is not an ASCII letter, digit, whitespace or hyphen is dropped. The result
/// is trimmed and each run of whitespace becomes a single underscore.
///
/// `"Foto Adicional 1 (Pozo)"` becomes `"Foto_Adicional_1_Pozo"`.
pub fn sanitize_name(s: &str) -> String {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// The stem shared by the report directory and the output spreadsheet, e.g.
/// `Reportes_Aysa_November_2025`.
///
/// If `month`/`year` do not form a valid date, a generic `INVALID_DATE_{month}_{year}` stem is
/// used and a warning is logged.
pub fn report_stem(prefix: &str, month: u32, year: i32) -> String {
    let month_name = match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => date.format("%B_%Y").to_string(),
        None => {
            warn!("Invalid target date ({month}/{year}), using a generic name");
            format!("INVALID_DATE_{month}_{year}")
        }
    };
    format!("{prefix}_{month_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_folder_unused() {
        let dir = TempDir::new().unwrap();
        let path = unique_folder(dir.path(), "Reportes");
        assert_eq!(path, dir.path().join("Reportes"));
    }

    #[test]
    fn test_unique_folder_probes_sequentially() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("Reportes")).unwrap();
        let second = unique_folder(dir.path(), "Reportes");
        assert_eq!(second, dir.path().join("Reportes2"));

        // Same answer until the candidate is created.
        assert_eq!(unique_folder(dir.path(), "Reportes"), second);

        std::fs::create_dir(&second).unwrap();
        std::fs::create_dir(dir.path().join("Reportes3")).unwrap();
        assert_eq!(
            unique_folder(dir.path(), "Reportes"),
            dir.path().join("Reportes4")
        );
    }

    #[test]
    fn test_unique_folder_does_not_fill_gaps() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("Reportes")).unwrap();
        std::fs::create_dir(dir.path().join("Reportes3")).unwrap();
        // "Reportes2" is free, so it is chosen; probing stops at the first free slot.
        assert_eq!(
            unique_folder(dir.path(), "Reportes"),
            dir.path().join("Reportes2")
        );
    }

    #[test]
    fn test_unique_output_file() {
        let dir = TempDir::new().unwrap();
        let first = unique_output_file(dir.path(), "Reportes_Aysa_November_2025");
        assert_eq!(first, dir.path().join("Reportes_Aysa_November_2025.xlsx"));

        std::fs::write(&first, b"x").unwrap();
        let second = unique_output_file(dir.path(), "Reportes_Aysa_November_2025");
        assert_ne!(first, second);
        assert_eq!(second, dir.path().join("Reportes_Aysa_November_20252.xlsx"));
        assert_eq!(
            unique_output_file(dir.path(), "Reportes_Aysa_November_2025"),
            second
        );

        std::fs::write(&second, b"x").unwrap();
        assert_eq!(
            unique_output_file(dir.path(), "Reportes_Aysa_November_2025"),
            dir.path().join("Reportes_Aysa_November_20253.xlsx")
        );
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Foto Vandalismo Pozo"), "Foto_Vandalismo_Pozo");
        assert_eq!(sanitize_name("  Foto (Frontal) Sitio! "), "Foto_Frontal_Sitio");
        assert_eq!(sanitize_name("Foto-Extra  2"), "Foto-Extra_2");
        assert_eq!(sanitize_name("Fotografía"), "Fotografa");
        assert_eq!(sanitize_name("???"), "");
    }

    #[test]
    fn test_report_stem() {
        assert_eq!(
            report_stem("Reportes_Aysa", 11, 2025),
            "Reportes_Aysa_November_2025"
        );
        assert_eq!(report_stem("R", 1, 2024), "R_January_2024");
        assert_eq!(
            report_stem("Reportes_Aysa", 13, 2025),
            "Reportes_Aysa_INVALID_DATE_13_2025"
        );
    }
}
