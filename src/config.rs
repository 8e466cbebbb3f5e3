//! Configuration file handling.
//!
//! The configuration file defaults to `./config.json`. It names the spreadsheet to export, the
//! month to report on, where to put the results and which columns hold dates, identifiers and
//! photos. A few of these can be overridden from the command line for a single run.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::file_id_from_url;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "photo-report";
const CONFIG_VERSION: u8 = 1;
const CLIENT_SECRET_JSON: &str = "credentials.json";
const TOKEN_JSON: &str = "token.json";
const DATE_COLUMN: &str = "Marca temporal";
const ID_COLUMN: &str = "ID de Relevamiento";
const REPORT_PREFIX: &str = "Reportes_Aysa";
const PHOTO_COLUMNS: &[&str] = &[
    "Foto Vandalismo Pozo",
    "Foto Vandalismo Sitio",
    "Foto Frontal Pozo",
    "Foto Adicional 1 Pozo",
    "Foto Adicional 2 Pozo",
    "Foto Adicional 3 Pozo",
    "Foto Frontal Sitio",
    "Foto Adicional 1 Sitio",
    "Foto Adicional 2 Sitio",
    "Foto Adicional 3 Sitio",
];

/// Values from the command line that replace those in the configuration file for one run.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub base_path: Option<PathBuf>,
    pub spreadsheet: Option<String>,
}

/// The `Config` object holds the immutable parameters of a run. It is created once at startup and
/// passed by reference to everything that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
}

impl Config {
    /// Writes a starter configuration file at `path` and returns the resulting `Config`.
    ///
    /// The target month is the current month and the column names are those of the survey form.
    ///
    /// # Errors
    /// - Returns an error if `path` already exists, if `spreadsheet` is not a spreadsheet ID or
    ///   URL, or if the file cannot be written.
    pub async fn create(
        path: impl Into<PathBuf>,
        spreadsheet: &str,
        base_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::create_inner(path.into(), spreadsheet, base_path.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(config_path: PathBuf, spreadsheet: &str, base_path: PathBuf) -> Res<Self> {
        if config_path.exists() {
            bail!(
                "The config file '{}' already exists, edit it instead",
                config_path.display()
            );
        }
        let today = Local::now().date_naive();
        let config_file = ConfigFile {
            spreadsheet: spreadsheet.to_string(),
            target_month: today.month(),
            target_year: today.year(),
            base_path,
            ..ConfigFile::default()
        };
        let spreadsheet_id = resolve_spreadsheet_id(&config_file.spreadsheet)?;
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            utils::make_dir(parent).await?;
        }
        config_file.save(&config_path).await?;
        Ok(Self {
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// Loads the configuration file at `path` and applies `overrides`.
    pub async fn load(path: impl Into<PathBuf>, overrides: &Overrides) -> Result<Self> {
        Self::load_inner(path.into(), overrides)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(config_path: PathBuf, overrides: &Overrides) -> Res<Self> {
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}'. Run 'photo-report init' to create one",
                config_path.display()
            )
        }
        let mut config_file = ConfigFile::load(&config_path).await?;
        config_file.apply(overrides);
        let spreadsheet_id = resolve_spreadsheet_id(&config_file.spreadsheet)?;
        Ok(Self {
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn target_month(&self) -> u32 {
        self.config_file.target_month
    }

    pub fn target_year(&self) -> i32 {
        self.config_file.target_year
    }

    pub fn base_path(&self) -> &Path {
        &self.config_file.base_path
    }

    pub fn date_column(&self) -> &str {
        &self.config_file.date_column
    }

    pub fn id_column(&self) -> &str {
        &self.config_file.id_column
    }

    pub fn report_prefix(&self) -> &str {
        &self.config_file.report_prefix
    }

    pub fn photo_columns(&self) -> &[String] {
        &self.config_file.photo_columns
    }

    /// Relative paths are relative to the working directory.
    pub fn client_secret_path(&self) -> &Path {
        &self.config_file.client_secret_path
    }

    /// Relative paths are relative to the working directory.
    pub fn token_path(&self) -> &Path {
        &self.config_file.token_path
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "photo-report",
///   "config_version": 1,
///   "spreadsheet": "https://docs.google.com/spreadsheets/d/1aAgfrKVw8TOSu1LBIaSqWoG3DAC0wxYVmJyHpkxNARw/edit",
///   "target_month": 11,
///   "target_year": 2025,
///   "base_path": "/srv/relevamientos",
///   "date_column": "Marca temporal",
///   "id_column": "ID de Relevamiento",
///   "report_prefix": "Reportes_Aysa",
///   "photo_columns": ["Foto Frontal Pozo", "Foto Frontal Sitio"],
///   "client_secret_path": "credentials.json",
///   "token_path": "token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "photo-report"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The ID of the Google Sheet, or its URL
    spreadsheet: String,

    /// The month to report on, 1 through 12
    target_month: u32,

    target_year: i32,

    /// The directory in which each run creates its report directory
    base_path: PathBuf,

    #[serde(default = "default_date_column")]
    date_column: String,

    #[serde(default = "default_id_column")]
    id_column: String,

    /// The start of the report directory and output file names
    #[serde(default = "default_report_prefix")]
    report_prefix: String,

    #[serde(default = "default_photo_columns")]
    photo_columns: Vec<String>,

    /// Path to the OAuth 2.0 client credentials file
    #[serde(default = "default_client_secret_path")]
    client_secret_path: PathBuf,

    /// Path to the OAuth token file
    #[serde(default = "default_token_path")]
    token_path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            spreadsheet: String::new(),
            target_month: 1,
            target_year: 2025,
            base_path: PathBuf::from("."),
            date_column: default_date_column(),
            id_column: default_id_column(),
            report_prefix: default_report_prefix(),
            photo_columns: default_photo_columns(),
            client_secret_path: default_client_secret_path(),
            token_path: default_token_path(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(month) = overrides.month {
            self.target_month = month;
        }
        if let Some(year) = overrides.year {
            self.target_year = year;
        }
        if let Some(base_path) = &overrides.base_path {
            self.base_path = base_path.clone();
        }
        if let Some(spreadsheet) = &overrides.spreadsheet {
            self.spreadsheet = spreadsheet.clone();
        }
    }
}

fn default_date_column() -> String {
    DATE_COLUMN.to_string()
}

fn default_id_column() -> String {
    ID_COLUMN.to_string()
}

fn default_report_prefix() -> String {
    REPORT_PREFIX.to_string()
}

fn default_photo_columns() -> Vec<String> {
    PHOTO_COLUMNS.iter().map(|s| s.to_string()).collect()
}

fn default_client_secret_path() -> PathBuf {
    PathBuf::from(CLIENT_SECRET_JSON)
}

fn default_token_path() -> PathBuf {
    PathBuf::from(TOKEN_JSON)
}

/// Accepts either a bare spreadsheet ID or a Google Sheets URL such as
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit`.
fn resolve_spreadsheet_id(spreadsheet: &str) -> Res<String> {
    let spreadsheet = spreadsheet.trim();
    if spreadsheet.is_empty() {
        bail!("No spreadsheet is configured");
    }
    if !spreadsheet.contains('/') {
        return Ok(spreadsheet.to_string());
    }
    file_id_from_url(spreadsheet).with_context(|| {
        format!(
            "Invalid Google Sheets URL '{spreadsheet}'. Expected: \
            https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
        )
    })
}
