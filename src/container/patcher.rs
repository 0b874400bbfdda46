use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigurationError, ContainerError};
use crate::translate::type_name;

use super::{Container, ContainerStore, NamedArray};

/// Variant mapping key naming the source container file.
pub const ADJUST_KEY: &str = "adjust";
pub const SOLVER_METHOD_KEY: &str = "solver_method";
pub const INTERPOLATION_KEY: &str = "interpolation";

/// Container variable holding the solver-method flag.
pub const SOLVER_FLAG_KEY: &str = "usecd";
/// Container variable holding the interpolation-method flag.
pub const INTERPOLATION_FLAG_KEY: &str = "intmethod";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMethod {
    Pstd,
    Fdtd,
}

impl SolverMethod {
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        match value {
            "pstd" => Ok(SolverMethod::Pstd),
            "fdtd" => Ok(SolverMethod::Fdtd),
            other => Err(ConfigurationError::InvalidSolverMethod {
                value: other.to_string(),
            }),
        }
    }

    pub fn flag_value(self) -> f64 {
        match self {
            SolverMethod::Pstd => 0.0,
            SolverMethod::Fdtd => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMethod {
    BandLimited,
    Cubic,
}

impl InterpolationMethod {
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        match value {
            "bli" => Ok(InterpolationMethod::BandLimited),
            "cubic" => Ok(InterpolationMethod::Cubic),
            other => Err(ConfigurationError::InvalidInterpolation {
                value: other.to_string(),
            }),
        }
    }

    pub fn flag_value(self) -> f64 {
        match self {
            InterpolationMethod::BandLimited => 2.0,
            InterpolationMethod::Cubic => 1.0,
        }
    }
}

/// Scalar fields a variant may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideField {
    SolverMethod,
    Interpolation,
}

impl OverrideField {
    pub fn container_key(self) -> &'static str {
        match self {
            OverrideField::SolverMethod => SOLVER_FLAG_KEY,
            OverrideField::Interpolation => INTERPOLATION_FLAG_KEY,
        }
    }
}

/// A field paired with its replacement. `None` leaves the container value alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureOverride {
    pub field: OverrideField,
    pub value: Option<f64>,
}

impl FixtureOverride {
    pub fn is_active(&self) -> bool {
        self.value.is_some()
    }
}

/// A validated variant mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRequest {
    /// Source container filename, relative to the fixture directory
    pub adjust: PathBuf,
    pub overrides: [FixtureOverride; 2],
}

impl VariantRequest {
    /// Validate a variant mapping. Unknown keys are ignored.
    pub fn from_config(config: &Value) -> Result<Self, ConfigurationError> {
        let adjust = match config.get(ADJUST_KEY) {
            None | Some(Value::Null) => {
                return Err(ConfigurationError::MissingField {
                    field: ADJUST_KEY.to_string(),
                })
            }
            Some(Value::String(name)) => PathBuf::from(name),
            Some(other) => {
                return Err(ConfigurationError::InvalidFieldType {
                    field: ADJUST_KEY.to_string(),
                    expected: "a string",
                    found: type_name(other).to_string(),
                })
            }
        };

        let solver = optional_choice(config, SOLVER_METHOD_KEY)?
            .map(SolverMethod::parse)
            .transpose()?;
        let interpolation = optional_choice(config, INTERPOLATION_KEY)?
            .map(InterpolationMethod::parse)
            .transpose()?;

        Ok(Self {
            adjust,
            overrides: [
                FixtureOverride {
                    field: OverrideField::SolverMethod,
                    value: solver.map(SolverMethod::flag_value),
                },
                FixtureOverride {
                    field: OverrideField::Interpolation,
                    value: interpolation.map(InterpolationMethod::flag_value),
                },
            ],
        })
    }

    pub fn active_overrides(&self) -> impl Iterator<Item = &FixtureOverride> {
        self.overrides.iter().filter(|o| o.is_active())
    }
}

/// Absent key means no override. A present `null` is a choice like any
/// other and fails to parse as one.
fn optional_choice<'a>(config: &'a Value, key: &str) -> Result<Option<&'a str>, ConfigurationError> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some("null")),
        Some(Value::String(choice)) => Ok(Some(choice)),
        Some(other) => Err(ConfigurationError::InvalidFieldType {
            field: key.to_string(),
            expected: "a string",
            found: type_name(other).to_string(),
        }),
    }
}

/// Derives fixture variants from an existing container by overriding
/// solver flags. Holds no state between calls besides the store.
#[derive(Debug, Clone, Default)]
pub struct FixtureVariantPatcher<S> {
    store: S,
}

impl<S: ContainerStore> FixtureVariantPatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Write `source_directory/output_name`, a copy of the container named
    /// by `overrides["adjust"]` with the requested flags replaced.
    ///
    /// Every override is resolved before the source is opened, so an invalid
    /// value leaves the filesystem untouched.
    pub fn patch(
        &self,
        source_directory: &Path,
        output_name: &Path,
        overrides: &Value,
    ) -> Result<PathBuf, ContainerError> {
        let request = VariantRequest::from_config(overrides)?;
        let source = source_directory.join(&request.adjust);
        let output = source_directory.join(output_name);
        if output == source {
            return Err(ConfigurationError::OutputOverwritesSource { path: source }.into());
        }

        let mut container = self.store.load(&source)?;
        let replaced = apply(&mut container, &request);
        self.store.save(&output, &container)?;

        tracing::info!(
            source = %source.display(),
            output = %output.display(),
            replaced,
            "wrote fixture variant"
        );
        Ok(output)
    }
}

/// Apply the active overrides in place. Returns how many keys were written.
pub(crate) fn apply(container: &mut Container, request: &VariantRequest) -> usize {
    let mut written = 0;
    for fixture_override in request.active_overrides() {
        if let Some(value) = fixture_override.value {
            let key = fixture_override.field.container_key();
            if let Some(previous) = container.insert(key, NamedArray::scalar(value)) {
                tracing::debug!(key, ?previous, value, "overrode container flag");
            }
            written += 1;
        }
    }
    written
}
