//! Validated unit of work for the external engine.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::{EngineArg, EngineCall};
use crate::error::ConfigurationError;

/// Obstacle tag meaning "no scattering object".
pub const FREE_SPACE_TAG: &str = "fs";

/// Obstacle radius used when the configuration does not give one (metres).
pub const DEFAULT_OBSTACLE_RADIUS: f64 = 15.0e-6;

/// One validated engine call.
///
/// Built by [`ConfigTranslator`](super::ConfigTranslator). The input file is
/// known to have existed at translation time; the single non-free-space
/// obstacle is only resolved when the call is dispatched, so edits made
/// through [`CallDescriptor::obstacle_set_mut`] are honored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDescriptor {
    pub(crate) working_directory: PathBuf,
    pub(crate) primary_input_path: PathBuf,
    pub(crate) obstacle_set: Vec<String>,
    pub(crate) needs_auxiliary_pass: bool,
    pub(crate) obstacle_radius: f64,
    pub(crate) needs_precomputed_field: bool,
}

impl CallDescriptor {
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn primary_input_path(&self) -> &Path {
        &self.primary_input_path
    }

    pub fn obstacle_set(&self) -> &[String] {
        &self.obstacle_set
    }

    pub fn obstacle_set_mut(&mut self) -> &mut Vec<String> {
        &mut self.obstacle_set
    }

    pub fn needs_auxiliary_pass(&self) -> bool {
        self.needs_auxiliary_pass
    }

    pub fn obstacle_radius(&self) -> f64 {
        self.obstacle_radius
    }

    pub fn needs_precomputed_field(&self) -> bool {
        self.needs_precomputed_field
    }

    /// The single scattering object present in the non-free-space run.
    ///
    /// Every free-space tag is removed from a copy of the obstacle list; what
    /// remains must be exactly one tag.
    pub fn non_free_space_obstacle(&self) -> Result<&str, ConfigurationError> {
        if self.obstacle_set.is_empty() {
            return Err(ConfigurationError::NoObstacles);
        }

        let remaining: Vec<&String> = self
            .obstacle_set
            .iter()
            .filter(|tag| tag.as_str() != FREE_SPACE_TAG)
            .collect();

        match remaining.as_slice() {
            [only] => Ok(only.as_str()),
            _ => Err(ConfigurationError::NonUniqueObstacle {
                remaining: remaining.into_iter().cloned().collect(),
            }),
        }
    }

    /// Positional call for `entry_point`.
    ///
    /// Argument order matches the engine routine's declared signature:
    /// `(working_directory, input_path, obstacle_tag, auxiliary_path_or_empty,
    /// obstacle_radius, needs_precomputed_field)`. A missing auxiliary input
    /// becomes the empty-string sentinel the routine expects.
    pub fn engine_call(
        &self,
        entry_point: &str,
        auxiliary_input: Option<&Path>,
    ) -> Result<EngineCall, ConfigurationError> {
        let obstacle = self.non_free_space_obstacle()?;
        let auxiliary = auxiliary_input
            .map(path_text)
            .unwrap_or_default();

        Ok(EngineCall {
            function: entry_point.to_string(),
            args: vec![
                EngineArg::Text(path_text(&self.working_directory)),
                EngineArg::Text(path_text(&self.primary_input_path)),
                EngineArg::Text(obstacle.to_string()),
                EngineArg::Text(auxiliary),
                EngineArg::Float(self.obstacle_radius),
                EngineArg::Flag(self.needs_precomputed_field),
            ],
        })
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
