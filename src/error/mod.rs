// Error types for the fixture tooling
//
// This module defines one error type per concern (configuration translation,
// engine sessions, container files), each carrying a numeric code so the
// automated suite can match on failures without parsing messages.

mod config;
mod container;
mod engine;

pub use config::{log_configuration_error, ConfigurationError, ConfigurationErrorCodes};
pub use container::{log_container_error, ContainerError, ContainerErrorCodes};
pub use engine::{log_engine_error, EngineError, EngineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
