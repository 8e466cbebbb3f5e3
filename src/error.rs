//! Error types for the public surface of the crate.
//!
//! Internally, functions return `Res<T>`, which is just an `anyhow::Result`. At the boundaries that
//! a caller (`main` or a test) sees, errors are tagged with an `ErrorType` so that the reason a run
//! was aborted can be matched on rather than parsed out of a message.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The reason a command failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The configuration file is missing or invalid.
    Config,
    /// The output directory could not be created.
    Directory,
    /// Authentication with Google failed.
    Auth,
    /// The spreadsheet could not be exported from Google Drive.
    Export,
    /// The exported spreadsheet could not be read as a table.
    Read,
    /// The output spreadsheet could not be written.
    Write,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

impl ErrorType {
    /// True for the failures that end a report run early. These are logged and the process still
    /// exits normally; only a bad configuration or an internal error changes the exit status.
    pub fn ends_run(&self) -> bool {
        match self {
            ErrorType::Directory
            | ErrorType::Auth
            | ErrorType::Export
            | ErrorType::Read
            | ErrorType::Write => true,
            ErrorType::Config | ErrorType::Internal => false,
        }
    }
}

/// An error with a reason code attached.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Alternate formatting prints the whole context chain on one line.
        write!(f, "[{}] {:#}", self.error_type, self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorType::Internal, value)
    }
}

/// Converts an internal `Res<T>` into a public `Result<T>` by tagging the error.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_tags_error() {
        let res: Res<()> = Err(anyhow::anyhow!("disk full")).context("Unable to save");
        let err = res.pub_result(ErrorType::Write).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Write);
        let message = err.to_string();
        assert!(message.starts_with("[write]"), "{message}");
        assert!(message.contains("Unable to save"), "{message}");
        assert!(message.contains("disk full"), "{message}");
    }

    #[test]
    fn test_ends_run() {
        for t in [
            ErrorType::Directory,
            ErrorType::Auth,
            ErrorType::Export,
            ErrorType::Read,
            ErrorType::Write,
        ] {
            assert!(t.ends_run(), "{t}");
        }
        assert!(!ErrorType::Config.ends_run());
        assert!(!ErrorType::Internal.ends_run());
    }

    #[test]
    fn test_error_type_from_str() {
        let t: ErrorType = "export".parse().unwrap();
        assert_eq!(t, ErrorType::Export);
        assert_eq!(ErrorType::Directory.to_string(), "directory");
    }
}
