// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Configuration error code constants
///
/// Error code range: 3001-3011
pub struct ConfigurationErrorCodes {}

impl ConfigurationErrorCodes {
    /// A required key is absent from the configuration mapping
    pub const MISSING_FIELD: i32 = 3001;

    /// A key is present but holds a value of the wrong type
    pub const INVALID_FIELD_TYPE: i32 = 3002;

    /// The referenced input file does not exist
    pub const INPUT_FILE_NOT_FOUND: i32 = 3003;

    /// The obstacle list contains non-string elements
    pub const NON_STRING_OBSTACLES: i32 = 3004;

    /// The obstacle list is empty
    pub const NO_OBSTACLES: i32 = 3005;

    /// Zero or several non-free-space obstacles remain
    pub const NON_UNIQUE_OBSTACLE: i32 = 3006;

    /// Obstacle radius is not a positive finite number
    pub const INVALID_RADIUS: i32 = 3007;

    /// Unknown solver method requested
    pub const INVALID_SOLVER_METHOD: i32 = 3008;

    /// Unknown interpolation method requested
    pub const INVALID_INTERPOLATION: i32 = 3009;

    /// Variant output would replace its own source container
    pub const OUTPUT_OVERWRITES_SOURCE: i32 = 3010;

    /// Fixture plan document is malformed
    pub const INVALID_PLAN: i32 = 3011;
}

/// Log a configuration error with structured context
pub fn log_configuration_error(err: &ConfigurationError, context: &str) {
    error!(
        "Configuration error in {}: code={}, component=ConfigTranslator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors
///
/// Raised while translating a configuration mapping into a call descriptor,
/// while resolving the descriptor's obstacle at dispatch time, or while
/// resolving container overrides. Always fatal to the single operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    MissingField {
        field: String,
    },

    InvalidFieldType {
        field: String,
        expected: &'static str,
        found: String,
    },

    InputFileNotFound {
        path: PathBuf,
    },

    /// `obstacles` holds the full offending list, rendered as JSON
    NonStringObstacles {
        obstacles: String,
    },

    NoObstacles,

    /// `remaining` is the list left after removing every free-space tag
    NonUniqueObstacle {
        remaining: Vec<String>,
    },

    InvalidRadius {
        radius: f64,
    },

    InvalidSolverMethod {
        value: String,
    },

    InvalidInterpolation {
        value: String,
    },

    OutputOverwritesSource {
        path: PathBuf,
    },

    InvalidPlan {
        reason: String,
    },
}

impl ConfigurationError {
    /// Name of the configuration field this error is about, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigurationError::MissingField { field }
            | ConfigurationError::InvalidFieldType { field, .. } => Some(field),
            ConfigurationError::InputFileNotFound { .. } => Some("input_file"),
            ConfigurationError::NonStringObstacles { .. }
            | ConfigurationError::NoObstacles
            | ConfigurationError::NonUniqueObstacle { .. } => Some("spatial_obstacles"),
            ConfigurationError::InvalidRadius { .. } => Some("obstacle_radius"),
            ConfigurationError::InvalidSolverMethod { .. } => Some("solver_method"),
            ConfigurationError::InvalidInterpolation { .. } => Some("interpolation"),
            ConfigurationError::OutputOverwritesSource { .. }
            | ConfigurationError::InvalidPlan { .. } => None,
        }
    }
}

impl ErrorCode for ConfigurationError {
    fn code(&self) -> i32 {
        match self {
            ConfigurationError::MissingField { .. } => ConfigurationErrorCodes::MISSING_FIELD,
            ConfigurationError::InvalidFieldType { .. } => {
                ConfigurationErrorCodes::INVALID_FIELD_TYPE
            }
            ConfigurationError::InputFileNotFound { .. } => {
                ConfigurationErrorCodes::INPUT_FILE_NOT_FOUND
            }
            ConfigurationError::NonStringObstacles { .. } => {
                ConfigurationErrorCodes::NON_STRING_OBSTACLES
            }
            ConfigurationError::NoObstacles => ConfigurationErrorCodes::NO_OBSTACLES,
            ConfigurationError::NonUniqueObstacle { .. } => {
                ConfigurationErrorCodes::NON_UNIQUE_OBSTACLE
            }
            ConfigurationError::InvalidRadius { .. } => ConfigurationErrorCodes::INVALID_RADIUS,
            ConfigurationError::InvalidSolverMethod { .. } => {
                ConfigurationErrorCodes::INVALID_SOLVER_METHOD
            }
            ConfigurationError::InvalidInterpolation { .. } => {
                ConfigurationErrorCodes::INVALID_INTERPOLATION
            }
            ConfigurationError::OutputOverwritesSource { .. } => {
                ConfigurationErrorCodes::OUTPUT_OVERWRITES_SOURCE
            }
            ConfigurationError::InvalidPlan { .. } => ConfigurationErrorCodes::INVALID_PLAN,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigurationError::MissingField { field } => {
                format!("required field {} not found in config", field)
            }
            ConfigurationError::InvalidFieldType {
                field,
                expected,
                found,
            } => format!("field {} must be {} (got {})", field, expected, found),
            ConfigurationError::InputFileNotFound { path } => {
                format!("{} does not exist", path.display())
            }
            ConfigurationError::NonStringObstacles { obstacles } => {
                format!("obstacles list {} contains non-string elements", obstacles)
            }
            ConfigurationError::NoObstacles => "no obstacles specified".to_string(),
            ConfigurationError::NonUniqueObstacle { remaining } => {
                format!("non-freespace obstacle is not unique ({:?})", remaining)
            }
            ConfigurationError::InvalidRadius { radius } => {
                format!("obstacle_radius must be positive and finite (got {})", radius)
            }
            ConfigurationError::InvalidSolverMethod { value } => {
                format!("{} is not a valid solver method", value)
            }
            ConfigurationError::InvalidInterpolation { value } => {
                format!("{} is not a valid interpolation method", value)
            }
            ConfigurationError::OutputOverwritesSource { path } => {
                format!("refusing to overwrite source container {}", path.display())
            }
            ConfigurationError::InvalidPlan { reason } => format!("invalid fixture plan: {}", reason),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigurationError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigurationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_codes() {
        assert_eq!(
            ConfigurationError::MissingField {
                field: "input_file".to_string()
            }
            .code(),
            ConfigurationErrorCodes::MISSING_FIELD
        );
        assert_eq!(
            ConfigurationError::NoObstacles.code(),
            ConfigurationErrorCodes::NO_OBSTACLES
        );
        assert_eq!(
            ConfigurationError::InvalidInterpolation {
                value: "invalid".to_string()
            }
            .code(),
            ConfigurationErrorCodes::INVALID_INTERPOLATION
        );
    }

    #[test]
    fn test_missing_field_message_names_field() {
        let err = ConfigurationError::MissingField {
            field: "spatial_obstacles".to_string(),
        };
        assert!(err.message().contains("spatial_obstacles"));
        assert_eq!(err.field(), Some("spatial_obstacles"));
    }

    #[test]
    fn test_display_carries_code() {
        let err = ConfigurationError::InvalidSolverMethod {
            value: "fem".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("ConfigurationError"));
        assert!(display.contains("3008"));
        assert!(display.contains("fem"));
    }
}
