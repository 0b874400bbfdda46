// Container file error types and constants

use crate::error::{ConfigurationError, ErrorCode};
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Container error code constants
///
/// Error code range: 5001-5005
pub struct ContainerErrorCodes {}

impl ContainerErrorCodes {
    pub const CONFIGURATION: i32 = 5001;
    pub const READ_FAILED: i32 = 5002;
    pub const PARSE_FAILED: i32 = 5003;
    pub const UNSUPPORTED_VERSION: i32 = 5004;
    pub const WRITE_FAILED: i32 = 5005;
}

/// Log a container error with structured context
pub fn log_container_error(err: &ContainerError, context: &str) {
    error!(
        "Container error in {}: code={}, component=FixtureVariantPatcher, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading, patching or saving container files
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerError {
    Configuration(ConfigurationError),

    Read { path: PathBuf, reason: String },

    Parse { path: PathBuf, reason: String },

    UnsupportedVersion { path: PathBuf, version: u32 },

    Write { path: PathBuf, reason: String },
}

impl ErrorCode for ContainerError {
    fn code(&self) -> i32 {
        match self {
            ContainerError::Configuration(_) => ContainerErrorCodes::CONFIGURATION,
            ContainerError::Read { .. } => ContainerErrorCodes::READ_FAILED,
            ContainerError::Parse { .. } => ContainerErrorCodes::PARSE_FAILED,
            ContainerError::UnsupportedVersion { .. } => ContainerErrorCodes::UNSUPPORTED_VERSION,
            ContainerError::Write { .. } => ContainerErrorCodes::WRITE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            ContainerError::Configuration(err) => err.message(),
            ContainerError::Read { path, reason } => {
                format!("failed to read container {}: {}", path.display(), reason)
            }
            ContainerError::Parse { path, reason } => {
                format!("failed to parse container {}: {}", path.display(), reason)
            }
            ContainerError::UnsupportedVersion { path, version } => {
                format!(
                    "container {} has unsupported format version {}",
                    path.display(),
                    version
                )
            }
            ContainerError::Write { path, reason } => {
                format!("failed to write container {}: {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for ContainerError {
    fn from(err: ConfigurationError) -> Self {
        ContainerError::Configuration(err)
    }
}
