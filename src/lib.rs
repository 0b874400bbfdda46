// EM Fixtures - reference fixture tooling for the electromagnetics solver
// Translates fixture configs into engine calls, drives engine sessions and
// derives container variants by flag patching

// Module declarations
pub mod auxiliary;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod plan;
pub mod translate;

// Re-exports for convenience
pub use auxiliary::AuxiliaryVariant;
pub use config::{EngineConfig, HarnessConfig};
pub use container::{ContainerStore, FixtureVariantPatcher, JsonContainerStore};
pub use engine::{CallBatch, EngineSessionManager, ProcessEngine, RecordingEngine};
pub use error::{ConfigurationError, ContainerError, EngineError, ErrorCode};
pub use plan::FixturePlan;
pub use translate::{CallDescriptor, ConfigTranslator};

use tracing::Level;

/// Install the stderr fmt subscriber used by the command-line tools.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
