//! Named-array container files and fixture variant patching.
//!
//! A container is a flat mapping from variable name to array. This crate
//! never interprets the arrays it does not override; it loads the whole
//! mapping, replaces a couple of scalar flags and writes it back under a new
//! name. The on-disk encoding sits behind [`ContainerStore`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

mod patcher;
mod store;

pub use patcher::{
    FixtureOverride, FixtureVariantPatcher, InterpolationMethod, OverrideField, SolverMethod,
    VariantRequest, ADJUST_KEY, INTERPOLATION_FLAG_KEY, INTERPOLATION_KEY, SOLVER_FLAG_KEY,
    SOLVER_METHOD_KEY,
};
pub use store::{JsonContainerStore, CONTAINER_FORMAT, CONTAINER_FORMAT_VERSION};

/// Typed array payload, stored column-major like the solver expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "snake_case")]
pub enum ArrayData {
    Float64(#[serde(with = "float_values")] Vec<f64>),
    Int64(Vec<i64>),
    Bool(Vec<bool>),
    Char(String),
}

/// One named variable of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArray {
    pub shape: Vec<usize>,
    pub data: ArrayData,
}

impl NamedArray {
    /// 1x1 float64 array.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: vec![1, 1],
            data: ArrayData::Float64(vec![value]),
        }
    }

    /// The value of a single-element float64 array.
    pub fn as_scalar(&self) -> Option<f64> {
        match &self.data {
            ArrayData::Float64(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }
}

/// In-memory container contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    arrays: BTreeMap<String, NamedArray>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.get(name)
    }

    /// Insert or replace a variable, returning the previous array.
    pub fn insert(&mut self, name: impl Into<String>, array: NamedArray) -> Option<NamedArray> {
        self.arrays.insert(name.into(), array)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub(crate) fn arrays(&self) -> &BTreeMap<String, NamedArray> {
        &self.arrays
    }

    pub(crate) fn from_arrays(arrays: BTreeMap<String, NamedArray>) -> Self {
        Self { arrays }
    }
}

/// JSON has no non-finite numbers; those are written as `"NaN"`, `"Inf"`
/// and `"-Inf"`.
mod float_values {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Inf";
    const NEG_INFINITY: &str = "-Inf";

    #[derive(Serialize)]
    #[serde(untagged)]
    enum Written {
        Number(f64),
        Named(&'static str),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Read {
        Number(f64),
        Named(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&value| {
            if value.is_nan() {
                Written::Named(NAN)
            } else if value == f64::INFINITY {
                Written::Named(INFINITY)
            } else if value == f64::NEG_INFINITY {
                Written::Named(NEG_INFINITY)
            } else {
                Written::Number(value)
            }
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Read>::deserialize(deserializer)?
            .into_iter()
            .map(|value| match value {
                Read::Number(number) => Ok(number),
                Read::Named(name) => match name.as_str() {
                    NAN => Ok(f64::NAN),
                    INFINITY => Ok(f64::INFINITY),
                    NEG_INFINITY => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!(
                        "unknown float64 value {other:?}"
                    ))),
                },
            })
            .collect()
    }
}

/// Whole-file load/store of containers.
pub trait ContainerStore {
    fn load(&self, path: &Path) -> Result<Container, ContainerError>;
    fn save(&self, path: &Path, container: &Container) -> Result<(), ContainerError>;
}

#[cfg(test)]
mod tests;
