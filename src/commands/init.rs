use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;
use tracing::info;

/// Creates an initial configuration file at `config_path` for `spreadsheet`, with reports written
/// under `base_path` and the default survey columns.
///
/// # Arguments
/// - `config_path` - Where to write the configuration file, e.g. `./config.json`
/// - `spreadsheet` - The ID or URL of the Google Sheet holding the survey responses,
///   e.g. https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
/// - `base_path` - The directory in which each run creates its report directory
///
/// # Errors
/// - Returns an error if the configuration file already exists or cannot be written.
pub async fn init(config_path: &Path, spreadsheet: &str, base_path: &Path) -> Result<Out<()>> {
    let config = Config::create(config_path, spreadsheet, base_path).await?;
    info!(
        "The report targets {}/{}, edit {} to change it",
        config.target_month(),
        config.target_year(),
        config.config_path().display()
    );
    Ok(format!(
        "Successfully created {}. Put your OAuth client credentials at {} and run \
        'photo-report auth'",
        config.config_path().display(),
        config.client_secret_path().display()
    )
    .into())
}
