//! Engine module housing the external engine session layer.
//!
//! This module exposes the trait-based session backend (`backend`), the
//! process-backed implementation (`process`), a recording implementation for
//! dry runs (`recording`) and the `EngineSessionManager` orchestration layer
//! (`session`).

pub mod backend;
mod call;
pub mod process;
pub mod recording;
pub mod session;

pub use backend::{EngineLauncher, EngineSession};
pub use call::{CallOutput, EngineArg, EngineCall};
pub use process::ProcessEngine;
pub use recording::{RecordedEvent, RecordingEngine};
pub use session::{BatchReport, CallBatch, EngineSessionManager, SessionSettings};
