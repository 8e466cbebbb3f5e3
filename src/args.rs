//! These structs provide the CLI interface for the photo-report CLI.

use crate::config::Overrides;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// photo-report: Back up the photos linked from a Google Forms survey sheet.
///
/// Each run exports the survey's Google Sheet, keeps the responses submitted in the target month,
/// downloads every photo those responses link to from Google Drive and writes a copy of the sheet
/// in which the photo links are replaced with the paths of the downloaded files.
///
/// You will need a Google Cloud OAuth client (a "Desktop app" client) with the Drive API enabled.
/// Download its credentials JSON next to your config file, then run `photo-report auth` once.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write a starter configuration file.
    ///
    /// The file targets the current month and uses the column names of the survey form. Edit it
    /// afterwards if your form differs. This fails if the configuration file already exists.
    Init(InitArgs),
    /// Authenticate with Google Drive via OAuth.
    Auth(AuthArgs),
    /// Export the sheet, download the photos and write the report.
    Run(RunArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The path to the configuration file.
    #[arg(long, env = "PHOTO_REPORT_CONFIG", default_value_t = default_config())]
    config: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, config: PathBuf) -> Self {
        Self {
            log_level,
            config: config.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn config(&self) -> &DisplayPath {
        &self.config
    }
}

/// (Not shown): Args for the `photo-report init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The ID of the survey's Google Sheet, or its URL. The URL looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX/edit
    #[arg(long)]
    spreadsheet: String,

    /// The directory in which report directories are created. Defaults to ~/relevamientos
    #[arg(long, default_value_t = default_base_path())]
    base_path: DisplayPath,
}

impl InitArgs {
    pub fn new(spreadsheet: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            base_path: DisplayPath(base_path.into()),
        }
    }

    pub fn spreadsheet(&self) -> &str {
        &self.spreadsheet
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// (Not shown): Args for the `photo-report auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `photo-report run` command. Each one replaces the value from the
/// configuration file for this run only.
#[derive(Debug, Default, Parser, Clone)]
pub struct RunArgs {
    /// The month to report on, 1 through 12.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// The year to report on.
    #[arg(long)]
    year: Option<i32>,

    /// The directory in which the report directory is created.
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// The ID of the Google Sheet, or its URL.
    #[arg(long)]
    spreadsheet: Option<String>,
}

impl RunArgs {
    pub fn new(month: Option<u32>, year: Option<i32>) -> Self {
        Self {
            month,
            year,
            ..Self::default()
        }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            month: self.month,
            year: self.year,
            base_path: self.base_path.clone(),
            spreadsheet: self.spreadsheet.clone(),
        }
    }
}

fn default_config() -> DisplayPath {
    DisplayPath(PathBuf::from("config.json"))
}

fn default_base_path() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("relevamientos"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --base-path instead of relying on the default. If you continue \
                using the program right now, reports will be written under the current directory.",
            );
            PathBuf::from("relevamientos")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
