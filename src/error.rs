//! Error types.
//!
//! Internally the crate uses `anyhow` (`Res<T>`) so that context can be attached freely. At the
//! public boundary errors are converted to `Error`, which carries an `ErrorType` so that callers
//! can tell a broken merchant map apart from a bad input file.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// The internal result type.
pub type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The configuration file or home directory is missing or invalid.
    Config,
    /// User supplied data (statement file, category name, split) could not be used.
    Input,
    /// The merchant map could not be read or written. The caller may retry or reload.
    Storage,
    /// An interactive or external service failed in a way that cannot be degraded.
    Service,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type.
#[derive(Debug, thiserror::Error)]
#[error("{error_type} error: {inner:#}")]
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: anyhow::Error) -> Self {
        Self { error_type, inner }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// True when the merchant map failed to load or persist.
    pub fn is_storage(&self) -> bool {
        self.error_type == ErrorType::Storage
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::new(ErrorType::Internal, e)
    }
}

/// Converts an internal result into a public one, tagging the error with an `ErrorType`.
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

    #[test]
    fn test_pub_result_tags_error() {
        let res: Res<()> = Err(anyhow::anyhow!("disk on fire"));
        let err = res.pub_result(ErrorType::Storage).unwrap_err();
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "storage error: disk on fire");
    }

    #[test]
    fn test_anyhow_converts_to_internal() {
        let err: Error = anyhow::anyhow!("oops").into();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::Input.to_string(), "input");
    }
}
