mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod naming;
pub mod processor;
mod utils;
pub mod xlsx;

#[cfg(test)]
mod test;

pub use api::{Drive, Mode, TestDrive, TEST_MODE_ENV};
pub use config::{Config, Overrides};
pub use error::{Error, ErrorType, Result};
