//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::load_csv;
use crate::{xlsx, Config, Overrides};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Test environment with a config file that targets November 2025.
/// Holds TempDir to keep the directory alive for the duration of the test.
///
/// Every path in the config, including the credentials and token files, is inside the temporary
/// directory. The credentials file is not created.
pub struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let config_path = dir.join("config.json");

        let rand = Uuid::new_v4().to_string().replace('-', "");
        let content = serde_json::json!({
            "app_name": "photo-report",
            "config_version": 1,
            "spreadsheet": format!("https://docs.google.com/spreadsheets/d/{rand}/edit"),
            "target_month": 11,
            "target_year": 2025,
            "base_path": dir.join("reports"),
            "client_secret_path": dir.join("credentials.json"),
            "token_path": dir.join("token.json"),
        });
        std::fs::write(&config_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
        let config = Config::load(&config_path, &Overrides::default())
            .await
            .unwrap();

        Self {
            temp_dir,
            config_path,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// Loads the config again with `overrides` applied.
    pub async fn config_with(&self, overrides: Overrides) -> Config {
        Config::load(&self.config_path, &overrides).await.unwrap()
    }

    /// The temporary directory. The config's base path is its `reports` subdirectory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `csv` (header first) as an XLSX workbook named `name` in the temporary directory.
    pub fn write_xlsx(&self, name: &str, csv: &str) -> PathBuf {
        let path = self.dir().join(name);
        let table = load_csv("Respuestas de formulario 1", csv).unwrap();
        xlsx::write_table(&path, &table).unwrap();
        path
    }
}
