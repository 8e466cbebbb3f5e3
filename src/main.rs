use clap::Parser;
use drive_photo_report::args::{Args, Command};
use drive_photo_report::{commands, Config, Error, Mode, Overrides, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            exit_code(&e)
        }
    }
}

/// A run that stops at one of its steps has still done what it can, and the log says why.
fn exit_code(e: &Error) -> ExitCode {
    if e.error_type().ends_run() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let config_path = args.common().config().path();

    // This allows for testing the program without hitting the Google APIs. When
    // PHOTO_REPORT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(config_path, init_args.spreadsheet(), init_args.base_path())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(config_path, &Overrides::default()).await?;
            if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Run(run_args) => {
            let config = Config::load(config_path, &run_args.overrides()).await?;
            commands::run(&config, mode).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "drive_photo_report={},{}={}",
                level,
                env!("CARGO_CRATE_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_photo_report::ErrorType;

    fn code(error_type: ErrorType) -> String {
        format!("{:?}", exit_code(&Error::new(error_type, anyhow::anyhow!("boom"))))
    }

    #[test]
    fn test_exit_code() {
        let success = format!("{:?}", ExitCode::SUCCESS);
        let failure = format!("{:?}", ExitCode::FAILURE);
        assert_eq!(code(ErrorType::Export), success);
        assert_eq!(code(ErrorType::Write), success);
        assert_eq!(code(ErrorType::Directory), success);
        assert_eq!(code(ErrorType::Config), failure);
    }
}
