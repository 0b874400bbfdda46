//! In-memory engine that records every operation instead of executing it.
//!
//! Used for dry runs (`em-fixtures calls`) and as the session double in
//! tests. Each launched session gets its own numeric id so callers can tell
//! which operations shared a session.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;

use crate::error::EngineError;

use super::{CallOutput, EngineArg, EngineCall, EngineLauncher, EngineSession};

/// Position of the auxiliary-input argument in an engine call.
const AUXILIARY_ARG_INDEX: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecordedEvent {
    Launch {
        session: u32,
        options: Vec<String>,
    },
    Cd {
        session: u32,
        dir: PathBuf,
    },
    AddPath {
        session: u32,
        dir: PathBuf,
    },
    Call {
        session: u32,
        call: EngineCall,
        /// Contents of the auxiliary input while the call ran, if one was passed
        #[serde(skip_serializing_if = "Option::is_none")]
        auxiliary_contents: Option<String>,
    },
    Quit {
        session: u32,
    },
}

#[derive(Debug, Default)]
struct Journal {
    events: Vec<RecordedEvent>,
    sessions_started: u32,
    calls_seen: usize,
    failing_calls: BTreeSet<usize>,
}

/// Recording launcher. Clones share one journal.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    journal: Rc<RefCell<Journal>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `index`-th call (zero-based, counted across sessions) fail.
    pub fn fail_call(&self, index: usize) {
        self.journal.borrow_mut().failing_calls.insert(index);
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.journal.borrow().events.clone()
    }

    pub fn sessions_started(&self) -> u32 {
        self.journal.borrow().sessions_started
    }

    /// Recorded calls with the session that ran them, in order.
    pub fn calls(&self) -> Vec<(u32, EngineCall)> {
        self.journal
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Call { session, call, .. } => Some((*session, call.clone())),
                _ => None,
            })
            .collect()
    }
}

impl EngineLauncher for RecordingEngine {
    fn launch(&self, startup_options: &[String]) -> Result<Box<dyn EngineSession>, EngineError> {
        let mut journal = self.journal.borrow_mut();
        journal.sessions_started += 1;
        let session = journal.sessions_started;
        journal.events.push(RecordedEvent::Launch {
            session,
            options: startup_options.to_vec(),
        });

        Ok(Box::new(RecordingSession {
            id: session,
            cwd: PathBuf::new(),
            journal: Rc::clone(&self.journal),
        }))
    }
}

struct RecordingSession {
    id: u32,
    cwd: PathBuf,
    journal: Rc<RefCell<Journal>>,
}

impl RecordingSession {
    fn record(&self, event: RecordedEvent) {
        self.journal.borrow_mut().events.push(event);
    }
}

impl EngineSession for RecordingSession {
    fn cd(&mut self, dir: &Path) -> Result<(), EngineError> {
        self.cwd = dir.to_path_buf();
        self.record(RecordedEvent::Cd {
            session: self.id,
            dir: dir.to_path_buf(),
        });
        Ok(())
    }

    fn pwd(&mut self) -> Result<PathBuf, EngineError> {
        Ok(self.cwd.clone())
    }

    fn addpath(&mut self, dir: &Path) -> Result<(), EngineError> {
        self.record(RecordedEvent::AddPath {
            session: self.id,
            dir: dir.to_path_buf(),
        });
        Ok(())
    }

    fn call(&mut self, call: &EngineCall) -> Result<CallOutput, EngineError> {
        let auxiliary_contents = match call.args.get(AUXILIARY_ARG_INDEX) {
            Some(EngineArg::Text(path)) if !path.is_empty() => fs::read_to_string(path).ok(),
            _ => None,
        };
        self.record(RecordedEvent::Call {
            session: self.id,
            call: call.clone(),
            auxiliary_contents,
        });

        let should_fail = {
            let mut journal = self.journal.borrow_mut();
            let index = journal.calls_seen;
            journal.calls_seen += 1;
            journal.failing_calls.contains(&index)
        };

        let output = CallOutput {
            stdout: format!("{}\n", call.render()),
            stderr: String::new(),
        };
        if should_fail {
            return Err(EngineError::CallFailed {
                function: call.function.clone(),
                message: "injected failure".to_string(),
                output,
            });
        }
        Ok(output)
    }

    fn quit(self: Box<Self>) -> Result<(), EngineError> {
        self.record(RecordedEvent::Quit { session: self.id });
        Ok(())
    }
}
