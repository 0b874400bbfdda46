//! Configuration translation
//!
//! Turns the `input_generation` mapping of a fixture configuration into a
//! [`CallDescriptor`]. The mapping is validated once here; nothing past this
//! boundary sees the loosely-typed JSON.
//!
//! Recognized keys:
//! - `input_file` (required): input script, relative to the base directory
//! - `spatial_obstacles` (required): list of obstacle tags
//! - `illsetup` / `illumination-setup-required`: needs an auxiliary pass
//! - `obstacle_radius`: radius in metres, `null` means default
//! - `calc_tdfield` / `needs_precomputed_field`: run the field precompute step
//!
//! Unknown keys are ignored.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::HarnessConfig;
use crate::error::ConfigurationError;

mod descriptor;

pub use descriptor::{CallDescriptor, DEFAULT_OBSTACLE_RADIUS, FREE_SPACE_TAG};

pub const INPUT_FILE_KEY: &str = "input_file";
pub const OBSTACLES_KEY: &str = "spatial_obstacles";
pub const OBSTACLE_RADIUS_KEY: &str = "obstacle_radius";
pub const AUXILIARY_PASS_KEYS: [&str; 2] = ["illsetup", "illumination-setup-required"];
pub const PRECOMPUTED_FIELD_KEYS: [&str; 2] = ["calc_tdfield", "needs_precomputed_field"];

/// Keys without which a descriptor cannot be built, in reporting order.
pub const REQUIRED_FIELDS: [&str; 2] = [INPUT_FILE_KEY, OBSTACLES_KEY];

/// Validates configuration mappings into [`CallDescriptor`]s.
#[derive(Debug, Clone)]
pub struct ConfigTranslator {
    base_dir: PathBuf,
}

impl ConfigTranslator {
    /// `base_dir` is the directory `input_file` entries are relative to.
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.input_base_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Translate one mapping into a descriptor whose outputs land in
    /// `working_directory`.
    pub fn translate<P: AsRef<Path>>(
        &self,
        working_directory: P,
        config: &Value,
    ) -> Result<CallDescriptor, ConfigurationError> {
        let map = config
            .as_object()
            .ok_or_else(|| ConfigurationError::InvalidFieldType {
                field: "input_generation".to_string(),
                expected: "a mapping",
                found: type_name(config).to_string(),
            })?;

        for required in REQUIRED_FIELDS {
            if !map.contains_key(required) {
                return Err(ConfigurationError::MissingField {
                    field: required.to_string(),
                });
            }
        }

        let primary_input_path = self.resolve_input_file(&map[INPUT_FILE_KEY])?;
        let obstacle_set = parse_obstacles(&map[OBSTACLES_KEY])?;
        let needs_auxiliary_pass = optional_flag(map, &AUXILIARY_PASS_KEYS)?;
        let needs_precomputed_field = optional_flag(map, &PRECOMPUTED_FIELD_KEYS)?;
        let obstacle_radius = optional_radius(map)?;

        let descriptor = CallDescriptor {
            working_directory: working_directory.as_ref().to_path_buf(),
            primary_input_path,
            obstacle_set,
            needs_auxiliary_pass,
            obstacle_radius,
            needs_precomputed_field,
        };

        tracing::debug!(
            input = %descriptor.primary_input_path.display(),
            obstacles = ?descriptor.obstacle_set,
            auxiliary = descriptor.needs_auxiliary_pass,
            "translated call descriptor"
        );
        Ok(descriptor)
    }

    fn resolve_input_file(&self, value: &Value) -> Result<PathBuf, ConfigurationError> {
        let relative = value
            .as_str()
            .ok_or_else(|| ConfigurationError::InvalidFieldType {
                field: INPUT_FILE_KEY.to_string(),
                expected: "a path string",
                found: type_name(value).to_string(),
            })?;

        let path = self.base_dir.join(relative);
        if !path.exists() {
            return Err(ConfigurationError::InputFileNotFound { path });
        }
        Ok(path)
    }
}

fn parse_obstacles(value: &Value) -> Result<Vec<String>, ConfigurationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ConfigurationError::InvalidFieldType {
            field: OBSTACLES_KEY.to_string(),
            expected: "a list of strings",
            found: type_name(value).to_string(),
        })?;

    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ConfigurationError::NonStringObstacles {
            obstacles: value.to_string(),
        })
}

/// First present alias wins. `null` counts as absent; numbers follow the
/// usual non-zero-is-true rule.
fn optional_flag(map: &Map<String, Value>, aliases: &[&str]) -> Result<bool, ConfigurationError> {
    let Some((key, value)) = aliases
        .iter()
        .find_map(|key| map.get(*key).map(|value| (*key, value)))
    else {
        return Ok(false);
    };

    match value {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        other => Err(ConfigurationError::InvalidFieldType {
            field: key.to_string(),
            expected: "a boolean",
            found: type_name(other).to_string(),
        }),
    }
}

fn optional_radius(map: &Map<String, Value>) -> Result<f64, ConfigurationError> {
    let radius = match map.get(OBSTACLE_RADIUS_KEY) {
        None | Some(Value::Null) => return Ok(DEFAULT_OBSTACLE_RADIUS),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| ConfigurationError::InvalidFieldType {
                field: OBSTACLE_RADIUS_KEY.to_string(),
                expected: "a number",
                found: type_name(value).to_string(),
            })?,
    };

    if !radius.is_finite() || radius <= 0.0 {
        return Err(ConfigurationError::InvalidRadius { radius });
    }
    Ok(radius)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
