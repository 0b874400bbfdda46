// Engine session error types and constants

use crate::engine::CallOutput;
use crate::error::{ConfigurationError, ErrorCode};
use log::{error, warn};
use std::fmt;
use std::path::PathBuf;

/// Engine error code constants
///
/// Error code range: 4001-4008
pub struct EngineErrorCodes {}

impl EngineErrorCodes {
    /// Batch had no descriptors; engine not started (warning class)
    pub const EMPTY_BATCH: i32 = 4001;

    /// Batch construction received invalid elements
    pub const INVALID_BATCH: i32 = 4002;

    /// External engine process could not be started
    pub const START_FAILED: i32 = 4003;

    /// Operation needs a running session
    pub const NOT_RUNNING: i32 = 4004;

    /// Engine process exited or closed its pipes mid-session
    pub const SESSION_LOST: i32 = 4005;

    /// The engine reported an error while executing a call
    pub const CALL_FAILED: i32 = 4006;

    /// Auxiliary input variant could not be produced
    pub const AUXILIARY_FAILED: i32 = 4007;

    /// Descriptor failed validation at dispatch time
    pub const CONFIGURATION: i32 = 4008;
}

/// Log an engine error with structured context
///
/// The empty-batch condition is a warning, everything else is logged as an
/// error.
pub fn log_engine_error(err: &EngineError, context: &str) {
    if err.is_warning() {
        warn!(
            "Engine warning in {}: code={}, component=EngineSession, message={}",
            context,
            err.code(),
            err.message()
        );
    } else {
        error!(
            "Engine error in {}: code={}, component=EngineSession, message={}",
            context,
            err.code(),
            err.message()
        );
    }
}

/// Engine session errors
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Nothing to run; the engine was not started
    EmptyBatch,

    InvalidBatch { invalid: usize, total: usize },

    StartFailed { executable: String, reason: String },

    NotRunning,

    SessionLost { reason: String },

    /// Captured output of the failing call is attached
    CallFailed {
        function: String,
        message: String,
        output: CallOutput,
    },

    Auxiliary { path: PathBuf, reason: String },

    Configuration(ConfigurationError),
}

impl EngineError {
    /// True for conditions that are reported but do not indicate a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, EngineError::EmptyBatch)
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> i32 {
        match self {
            EngineError::EmptyBatch => EngineErrorCodes::EMPTY_BATCH,
            EngineError::InvalidBatch { .. } => EngineErrorCodes::INVALID_BATCH,
            EngineError::StartFailed { .. } => EngineErrorCodes::START_FAILED,
            EngineError::NotRunning => EngineErrorCodes::NOT_RUNNING,
            EngineError::SessionLost { .. } => EngineErrorCodes::SESSION_LOST,
            EngineError::CallFailed { .. } => EngineErrorCodes::CALL_FAILED,
            EngineError::Auxiliary { .. } => EngineErrorCodes::AUXILIARY_FAILED,
            EngineError::Configuration(_) => EngineErrorCodes::CONFIGURATION,
        }
    }

    fn message(&self) -> String {
        match self {
            EngineError::EmptyBatch => {
                "No engine calls specified in this session. Engine not started.".to_string()
            }
            EngineError::InvalidBatch { invalid, total } => {
                format!("not all inputs are valid engine calls ({}/{} invalid)", invalid, total)
            }
            EngineError::StartFailed { executable, reason } => {
                format!("failed to start engine {}: {}", executable, reason)
            }
            EngineError::NotRunning => {
                "Engine session not running. Call run() first.".to_string()
            }
            EngineError::SessionLost { reason } => {
                format!("engine session lost: {}", reason)
            }
            EngineError::CallFailed {
                function, message, ..
            } => format!("engine call {} failed: {}", function, message),
            EngineError::Auxiliary { path, reason } => {
                format!(
                    "failed to prepare auxiliary input {}: {}",
                    path.display(),
                    reason
                )
            }
            EngineError::Configuration(err) => err.message(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for EngineError {
    fn from(err: ConfigurationError) -> Self {
        EngineError::Configuration(err)
    }
}
