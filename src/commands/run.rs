use crate::api::{self, Drive, Mode};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::processor::{DataProcessor, ProcessOutcome};
use crate::{naming, utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// The name of the exported copy of the sheet inside the report directory.
pub const EXPORT_FILE_NAME: &str = "Formulario_Unificado.xlsx";

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_root: PathBuf,
    pub export_path: PathBuf,
    pub outcome: ProcessOutcome,
}

/// Handles the `photo-report run` command.
///
/// Creates a fresh report directory under the base path, exports the sheet into it and hands the
/// export to the `DataProcessor`. Each step is fatal if it fails. In `Mode::Google` this may start
/// the interactive OAuth flow when there is no usable cached token.
///
/// A month with no matching rows is a success.
pub async fn run(config: &Config, mode: Mode) -> Result<Out<RunReport>> {
    let stem = naming::report_stem(
        config.report_prefix(),
        config.target_month(),
        config.target_year(),
    );

    let output_root = naming::unique_folder(config.base_path(), &stem);
    utils::make_dir(&output_root)
        .await
        .context("Unable to create the report directory")
        .pub_result(ErrorType::Directory)?;
    info!("Report directory is {}", output_root.display());

    let mut drive = api::drive(config, mode)
        .await
        .context("Unable to authenticate with Google Drive")
        .pub_result(ErrorType::Auth)?;

    export_and_process(config, output_root, &stem, drive.as_mut()).await
}

/// Exports the sheet into `output_root` and processes it with `drive`.
async fn export_and_process(
    config: &Config,
    output_root: PathBuf,
    stem: &str,
    drive: &mut (dyn Drive + Send),
) -> Result<Out<RunReport>> {
    let month = config.target_month();
    let year = config.target_year();
    let export_path = output_root.join(EXPORT_FILE_NAME);
    info!("Exporting spreadsheet {}", config.spreadsheet_id());
    drive
        .export_spreadsheet(config.spreadsheet_id(), &export_path)
        .await
        .pub_result(ErrorType::Export)?;

    let mut processor = DataProcessor::new(config, &output_root, stem, drive).await?;
    let outcome = processor.process_data(&export_path).await?;

    let message = match &outcome {
        ProcessOutcome::NoMatchingRows => {
            format!("No responses found for {month}/{year}, no report was written")
        }
        ProcessOutcome::Written { path, summary } => format!(
            "Wrote {} with {} rows: {} photos downloaded, {} already present, {} failed",
            path.display(),
            summary.rows,
            summary.downloaded,
            summary.already_present,
            summary.failed
        ),
    };
    Ok(Out::new(
        message,
        RunReport {
            output_root,
            export_path,
            outcome,
        },
    ))
}
