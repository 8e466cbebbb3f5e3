//! Access to the remote file store.
//!
//! The `Drive` trait is the seam between the row processor and Google Drive. `GoogleDrive` talks to
//! the Drive v3 REST API and `TestDrive` holds everything in memory so that the whole program can
//! run without network access.

mod drive;
mod drive_test_client;
mod files;
mod oauth;

use crate::error::Res;
use crate::Config;
use std::path::Path;
use tracing::debug;

pub use drive_test_client::TestDrive;
pub(crate) use oauth::TokenProvider;

#[cfg(test)]
pub(crate) use drive_test_client::{fake_jpeg, load_csv};

/// Drive access is needed to export the sheet and to download photos.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
pub const TEST_MODE_ENV: &str = "PHOTO_REPORT_IN_TEST_MODE";

/// Operations on the remote file store.
///
/// Both operations are awaited one at a time; implementations need not be re-entrant.
#[async_trait::async_trait]
pub trait Drive {
    /// Exports the hosted spreadsheet `spreadsheet_id` as an XLSX file at `destination`.
    async fn export_spreadsheet(&mut self, spreadsheet_id: &str, destination: &Path) -> Res<()>;

    /// Writes the contents of the file `file_id` to `destination`, replacing anything there.
    async fn download_file(&mut self, file_id: &str, destination: &Path) -> Res<()>;
}

/// Selects the `Drive` implementation.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// `Mode::Test` if `PHOTO_REPORT_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Drive` for a run. In `Mode::Google` this authenticates, which may start the
/// interactive consent flow.
pub(crate) async fn drive(config: &Config, mode: Mode) -> Res<Box<dyn Drive + Send>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::authenticate(config.client_secret_path(), config.token_path())
                    .await?;
            debug!("Authenticated with Google Drive");
            Ok(Box::new(drive::GoogleDrive::new(token_provider)))
        }
        Mode::Test => {
            debug!("Using the in-memory test drive");
            Ok(Box::new(TestDrive::seeded(config.spreadsheet_id())?))
        }
    }
}
