//! Session lifecycle and ordered dispatch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::auxiliary::{auxiliary_path_for, AuxiliaryVariant};
use crate::config::HarnessConfig;
use crate::error::{log_configuration_error, ConfigurationError, EngineError};
use crate::translate::CallDescriptor;

use super::{CallOutput, EngineLauncher, EngineSession};

/// Ordered descriptors to run in one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallBatch {
    calls: Vec<CallDescriptor>,
}

impl CallBatch {
    /// Build a batch from translation results.
    ///
    /// Every element is inspected; if any failed translation the whole batch
    /// is rejected with the number of invalid elements.
    pub fn from_translations<I>(translations: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = Result<CallDescriptor, ConfigurationError>>,
    {
        let mut calls = Vec::new();
        let mut invalid = 0usize;
        let mut total = 0usize;

        for (index, translation) in translations.into_iter().enumerate() {
            total += 1;
            match translation {
                Ok(descriptor) => calls.push(descriptor),
                Err(err) => {
                    invalid += 1;
                    log_configuration_error(&err, &format!("batch element {index}"));
                }
            }
        }

        if invalid > 0 {
            return Err(EngineError::InvalidBatch { invalid, total });
        }
        Ok(Self { calls })
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl From<CallDescriptor> for CallBatch {
    fn from(descriptor: CallDescriptor) -> Self {
        Self {
            calls: vec![descriptor],
        }
    }
}

impl From<Vec<CallDescriptor>> for CallBatch {
    fn from(calls: Vec<CallDescriptor>) -> Self {
        Self { calls }
    }
}

/// Fixed session settings, taken from [`HarnessConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub startup_options: Vec<String>,
    pub working_dir: PathBuf,
    pub search_paths: Vec<PathBuf>,
    pub entry_point: String,
}

impl From<&HarnessConfig> for SessionSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            startup_options: config.engine.startup_options.clone(),
            working_dir: config.engine_working_dir.clone(),
            search_paths: config.extra_search_paths.clone(),
            entry_point: config.engine.entry_point.clone(),
        }
    }
}

/// Result of a completed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Working directory the engine reported after startup
    pub working_directory: PathBuf,
    /// Captured output per descriptor, in dispatch order
    pub outputs: Vec<CallOutput>,
}

/// Owns one engine session and runs a batch of descriptors against it.
pub struct EngineSessionManager<L: EngineLauncher> {
    launcher: L,
    settings: SessionSettings,
    calls: Vec<CallDescriptor>,
    session: Option<Box<dyn EngineSession>>,
    cwd: Option<PathBuf>,
    registered_paths: Vec<PathBuf>,
}

impl<L: EngineLauncher> EngineSessionManager<L> {
    /// The engine is not started until [`run`](Self::run).
    pub fn new(launcher: L, settings: SessionSettings, batch: impl Into<CallBatch>) -> Self {
        Self {
            launcher,
            settings,
            calls: batch.into().calls,
            session: None,
            cwd: None,
            registered_paths: Vec::new(),
        }
    }

    pub fn from_config(launcher: L, config: &HarnessConfig, batch: impl Into<CallBatch>) -> Self {
        Self::new(launcher, SessionSettings::from(config), batch)
    }

    pub fn calls(&self) -> &[CallDescriptor] {
        &self.calls
    }

    /// Descriptors are re-validated at dispatch, so edits here take effect.
    pub fn calls_mut(&mut self) -> &mut [CallDescriptor] {
        &mut self.calls
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Working directory the engine reported, once a session has started.
    pub fn working_directory(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn registered_paths(&self) -> &[PathBuf] {
        &self.registered_paths
    }

    /// Run every descriptor, in order, in one session.
    ///
    /// An empty batch returns [`EngineError::EmptyBatch`] without starting
    /// the engine. A session left running by an earlier `run` is reused. If a
    /// descriptor fails, later descriptors are skipped and the session stays
    /// up for the caller to inspect or [`stop`](Self::stop).
    pub fn run(&mut self, kill_on_complete: bool) -> Result<BatchReport, EngineError> {
        if self.calls.is_empty() {
            tracing::warn!("no engine calls queued; engine not started");
            return Err(EngineError::EmptyBatch);
        }

        if self.session.is_none() {
            self.start()?;
        }
        let working_directory = self.cwd.clone().unwrap_or_default();
        let Some(session) = self.session.as_mut() else {
            return Err(EngineError::NotRunning);
        };

        let mut outputs = Vec::with_capacity(self.calls.len());
        for (index, descriptor) in self.calls.iter().enumerate() {
            tracing::info!(
                index,
                input = %descriptor.primary_input_path().display(),
                output_dir = %descriptor.working_directory().display(),
                "dispatching engine call"
            );
            outputs.push(dispatch(
                session.as_mut(),
                descriptor,
                &self.settings.entry_point,
            )?);
        }

        if kill_on_complete {
            self.stop()?;
        }

        Ok(BatchReport {
            working_directory,
            outputs,
        })
    }

    /// Terminate the session. Its working directory and search paths are
    /// forgotten even if the engine fails to quit cleanly.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        let session = self.session.take().ok_or(EngineError::NotRunning)?;
        self.cwd = None;
        self.registered_paths.clear();
        session.quit()
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut session = self.launcher.launch(&self.settings.startup_options)?;
        session.cd(&self.settings.working_dir)?;
        let cwd = session.pwd()?;
        for path in &self.settings.search_paths {
            session.addpath(path)?;
        }

        tracing::info!(
            cwd = %cwd.display(),
            search_paths = self.settings.search_paths.len(),
            "engine session ready"
        );
        self.cwd = Some(cwd);
        self.registered_paths = self.settings.search_paths.clone();
        self.session = Some(session);
        Ok(())
    }
}

/// Dispatch one descriptor. The auxiliary variant, when needed, lives
/// exactly as long as the engine call.
fn dispatch(
    session: &mut dyn EngineSession,
    descriptor: &CallDescriptor,
    entry_point: &str,
) -> Result<CallOutput, EngineError> {
    if !descriptor.needs_auxiliary_pass() {
        let call = descriptor.engine_call(entry_point, None)?;
        return session.call(&call);
    }

    let auxiliary_path = auxiliary_path_for(descriptor.primary_input_path());
    let call = descriptor.engine_call(entry_point, Some(auxiliary_path.as_path()))?;
    let variant = AuxiliaryVariant::create(descriptor.primary_input_path())?;
    let result = session.call(&call);
    drop(variant);
    result
}

#[cfg(test)]
mod tests;
