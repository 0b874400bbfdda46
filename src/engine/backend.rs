//! Backend abstractions for the external numeric engine.

use std::path::{Path, PathBuf};

use crate::error::EngineError;

use super::{CallOutput, EngineCall};

/// Starts engine sessions.
///
/// Implemented by [`ProcessEngine`](super::ProcessEngine) for real runs and by
/// in-memory doubles in tests.
pub trait EngineLauncher {
    fn launch(&self, startup_options: &[String]) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// A live engine session.
///
/// Calls are blocking and strictly sequential; the session is exclusively
/// owned by its [`EngineSessionManager`](super::EngineSessionManager).
pub trait EngineSession {
    /// Change the session's working directory.
    fn cd(&mut self, dir: &Path) -> Result<(), EngineError>;

    /// Working directory as reported by the engine.
    fn pwd(&mut self) -> Result<PathBuf, EngineError>;

    /// Register an extra directory on the engine's search path.
    fn addpath(&mut self, dir: &Path) -> Result<(), EngineError>;

    /// Execute `call`, capturing its output. A failing call returns
    /// [`EngineError::CallFailed`] with the captured output attached.
    fn call(&mut self, call: &EngineCall) -> Result<CallOutput, EngineError>;

    /// Terminate the session.
    fn quit(self: Box<Self>) -> Result<(), EngineError>;
}
