//! Fixture plan catalog.
//!
//! A plan lists every reference fixture the suite needs: the directory its
//! outputs land in, the configuration mappings that drive input generation
//! through the engine, and the container variants derived afterwards by
//! flag patching. Directories are resolved against a caller-supplied root,
//! normally the directory holding the plan file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::container::{ContainerStore, FixtureVariantPatcher, ADJUST_KEY};
use crate::engine::CallBatch;
use crate::error::{ConfigurationError, ContainerError, EngineError};
use crate::translate::{CallDescriptor, ConfigTranslator};

/// Machine-readable catalog of fixtures to generate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixturePlan {
    pub version: u32,
    pub fixtures: Vec<FixturePlanEntry>,
}

impl FixturePlan {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            plan_error(format!("failed to read fixture plan {}: {err}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Parse plan contents from JSON and validate invariants.
    pub fn from_json(data: &str) -> Result<Self, ConfigurationError> {
        let plan: FixturePlan = serde_json::from_str(data)
            .map_err(|err| plan_error(format!("failed to parse fixture plan JSON: {err}")))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn find(&self, id: &str) -> Option<&FixturePlanEntry> {
        self.fixtures.iter().find(|fixture| fixture.id == id)
    }

    /// Translate every input-generation mapping, in plan order.
    pub fn translate(
        &self,
        translator: &ConfigTranslator,
        root: &Path,
    ) -> Vec<Result<CallDescriptor, ConfigurationError>> {
        self.fixtures
            .iter()
            .flat_map(|fixture| {
                let directory = fixture.directory_in(root);
                fixture
                    .input_generation
                    .iter()
                    .map(move |config| translator.translate(&directory, config))
            })
            .collect()
    }

    /// One batch holding every engine call the plan needs.
    pub fn call_batch(
        &self,
        translator: &ConfigTranslator,
        root: &Path,
    ) -> Result<CallBatch, EngineError> {
        CallBatch::from_translations(self.translate(translator, root))
    }

    /// Derive every variant container. Stops at the first failure.
    pub fn derive_variants<S: ContainerStore>(
        &self,
        patcher: &FixtureVariantPatcher<S>,
        root: &Path,
    ) -> Result<Vec<PathBuf>, ContainerError> {
        let mut written = Vec::new();
        for fixture in &self.fixtures {
            let directory = fixture.directory_in(root);
            for variant in &fixture.variants {
                written.push(patcher.patch(&directory, &variant.output, &variant.overrides())?);
            }
        }
        Ok(written)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version == 0 {
            return Err(plan_error("plan version must be > 0"));
        }
        if self.fixtures.is_empty() {
            return Err(plan_error("plan must contain at least one fixture"));
        }

        let mut seen = HashSet::new();
        for entry in &self.fixtures {
            if !seen.insert(entry.id.as_str()) {
                return Err(plan_error(format!(
                    "duplicate fixture id detected: {}",
                    entry.id
                )));
            }
            entry.validate()?;
        }
        Ok(())
    }
}

/// One fixture: where it lives and how it is produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixturePlanEntry {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub directory: PathBuf,
    /// Configuration mappings handed to the translator
    #[serde(default)]
    pub input_generation: Vec<Value>,
    #[serde(default)]
    pub variants: Vec<VariantEntry>,
}

impl FixturePlanEntry {
    pub fn directory_in(&self, root: &Path) -> PathBuf {
        root.join(&self.directory)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.id.trim().is_empty() {
            return Err(plan_error("fixture id cannot be empty"));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(plan_error(format!(
                "fixture {} must name a directory",
                self.id
            )));
        }
        if self.input_generation.is_empty() && self.variants.is_empty() {
            return Err(plan_error(format!(
                "fixture {} generates nothing",
                self.id
            )));
        }
        if let Some(index) = self
            .input_generation
            .iter()
            .position(|config| !config.is_object())
        {
            return Err(plan_error(format!(
                "fixture {} input_generation[{}] must be a mapping",
                self.id, index
            )));
        }
        for variant in &self.variants {
            variant.validate(&self.id)?;
        }
        Ok(())
    }
}

/// A container variant: output filename plus the override mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantEntry {
    pub output: PathBuf,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl VariantEntry {
    /// The override mapping in the shape the patcher consumes.
    pub fn overrides(&self) -> Value {
        Value::Object(self.options.clone())
    }

    fn validate(&self, id: &str) -> Result<(), ConfigurationError> {
        if self.output.as_os_str().is_empty() {
            return Err(plan_error(format!(
                "fixture {} has a variant without an output name",
                id
            )));
        }
        if !self.options.contains_key(ADJUST_KEY) {
            return Err(plan_error(format!(
                "variant {} of fixture {} must name the container to {}",
                self.output.display(),
                id,
                ADJUST_KEY
            )));
        }
        Ok(())
    }
}

fn plan_error(reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidPlan {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{JsonContainerStore, NamedArray, SOLVER_FLAG_KEY};
    use crate::container::Container;
    use serde_json::json;

    fn sample_plan() -> Value {
        json!({
            "version": 1,
            "fixtures": [
                {
                    "id": "arc_01",
                    "directory": "arc_01",
                    "input_generation": [
                        {"input_file": "input_file.m", "spatial_obstacles": ["fs", "cyl"]},
                        {"input_file": "input_file.m", "spatial_obstacles": ["fs", "sph"], "illsetup": true}
                    ],
                    "variants": [
                        {"output": "pstd_cyl.json", "adjust": "fdtd_cyl.json", "solver_method": "pstd"}
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_plan_parses_and_finds_entries() {
        let plan = FixturePlan::from_json(&sample_plan().to_string()).unwrap();
        let entry = plan.find("arc_01").unwrap();
        assert_eq!(entry.input_generation.len(), 2);
        assert_eq!(entry.variants[0].output, PathBuf::from("pstd_cyl.json"));
        assert_eq!(entry.variants[0].overrides()["solver_method"], json!("pstd"));
        assert!(entry.variants[0].overrides().get("output").is_none());
        assert!(plan.find("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut raw = sample_plan();
        let entry = raw["fixtures"][0].clone();
        raw["fixtures"].as_array_mut().unwrap().push(entry);
        let err = FixturePlan::from_json(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("duplicate fixture id"));
    }

    #[test]
    fn test_variant_without_source_rejected() {
        let mut raw = sample_plan();
        raw["fixtures"][0]["variants"][0]
            .as_object_mut()
            .unwrap()
            .remove("adjust");
        let err = FixturePlan::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPlan { .. }));
    }

    #[test]
    fn test_zero_version_rejected() {
        let mut raw = sample_plan();
        raw["version"] = json!(0);
        assert!(FixturePlan::from_json(&raw.to_string()).is_err());
    }

    #[test]
    fn test_batch_uses_fixture_directory_as_working_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("input_file.m"), "I = 8;\n").unwrap();
        let plan = FixturePlan::from_json(&sample_plan().to_string()).unwrap();
        let translator = ConfigTranslator::new(root.path());

        let translations = plan.translate(&translator, root.path());
        assert_eq!(translations.len(), 2);
        let descriptor = translations[1].as_ref().unwrap();
        assert_eq!(descriptor.working_directory(), root.path().join("arc_01"));
        assert!(descriptor.needs_auxiliary_pass());

        let batch = plan.call_batch(&translator, root.path()).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_derive_variants_writes_into_fixture_directory() {
        let root = tempfile::tempdir().unwrap();
        let fixture_dir = root.path().join("arc_01");
        fs::create_dir(&fixture_dir).unwrap();
        let mut source = Container::new();
        source.insert(SOLVER_FLAG_KEY, NamedArray::scalar(1.0));
        JsonContainerStore
            .save(&fixture_dir.join("fdtd_cyl.json"), &source)
            .unwrap();

        let plan = FixturePlan::from_json(&sample_plan().to_string()).unwrap();
        let written = plan
            .derive_variants(&FixtureVariantPatcher::new(JsonContainerStore), root.path())
            .unwrap();

        assert_eq!(written, vec![fixture_dir.join("pstd_cyl.json")]);
        let patched = JsonContainerStore.load(&written[0]).unwrap();
        assert_eq!(patched.get(SOLVER_FLAG_KEY).unwrap().as_scalar(), Some(0.0));
    }
}
