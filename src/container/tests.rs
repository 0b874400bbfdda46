use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::error::{ConfigurationError, ContainerError};

const SOURCE_NAME: &str = "pstd_fs.json";

fn source_container() -> Container {
    let mut container = Container::new();
    container.insert(SOLVER_FLAG_KEY, NamedArray::scalar(1.0));
    container.insert(INTERPOLATION_FLAG_KEY, NamedArray::scalar(1.0));
    container.insert(
        "I",
        NamedArray {
            shape: vec![1, 3],
            data: ArrayData::Int64(vec![128, 128, 64]),
        },
    );
    container.insert(
        "material",
        NamedArray {
            shape: vec![1, 6],
            data: ArrayData::Char("vacuum".into()),
        },
    );
    container
}

fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    JsonContainerStore
        .save(&dir.path().join(SOURCE_NAME), &source_container())
        .expect("write source container");
    dir
}

fn patcher() -> FixtureVariantPatcher<JsonContainerStore> {
    FixtureVariantPatcher::new(JsonContainerStore)
}

#[test]
fn solver_override_leaves_interpolation_flag_alone() {
    let dir = fixture_dir();
    let source_bytes = fs::read(dir.path().join(SOURCE_NAME)).unwrap();

    let output = patcher()
        .patch(
            dir.path(),
            Path::new("pstd_variant.json"),
            &json!({"adjust": SOURCE_NAME, "solver_method": "pstd"}),
        )
        .unwrap();

    let source = JsonContainerStore.load(&dir.path().join(SOURCE_NAME)).unwrap();
    let patched = JsonContainerStore.load(&output).unwrap();
    assert_eq!(patched.get(SOLVER_FLAG_KEY).unwrap().as_scalar(), Some(0.0));
    assert_eq!(
        patched.get(INTERPOLATION_FLAG_KEY),
        source.get(INTERPOLATION_FLAG_KEY)
    );
    assert_eq!(patched.get("I"), source.get("I"));
    assert_eq!(patched.len(), source.len());
    assert_eq!(fs::read(dir.path().join(SOURCE_NAME)).unwrap(), source_bytes);
}

#[test]
fn interpolation_override_uses_band_limited_code() {
    let dir = fixture_dir();
    let output = patcher()
        .patch(
            dir.path(),
            Path::new("bli.json"),
            &json!({"adjust": SOURCE_NAME, "interpolation": "bli", "solver_method": "fdtd"}),
        )
        .unwrap();

    let patched = JsonContainerStore.load(&output).unwrap();
    assert_eq!(
        patched.get(INTERPOLATION_FLAG_KEY).unwrap().as_scalar(),
        Some(2.0)
    );
    assert_eq!(patched.get(SOLVER_FLAG_KEY).unwrap().as_scalar(), Some(1.0));
}

#[test]
fn no_overrides_reproduces_source() {
    let dir = fixture_dir();
    let output = patcher()
        .patch(dir.path(), Path::new("copy.json"), &json!({"adjust": SOURCE_NAME}))
        .unwrap();

    let source = JsonContainerStore.load(&dir.path().join(SOURCE_NAME)).unwrap();
    assert_eq!(JsonContainerStore.load(&output).unwrap(), source);
}

#[test]
fn invalid_interpolation_writes_nothing() {
    let dir = fixture_dir();
    let err = patcher()
        .patch(
            dir.path(),
            Path::new("bad.json"),
            &json!({"adjust": SOURCE_NAME, "interpolation": "invalid"}),
        )
        .unwrap_err();

    assert_eq!(
        err,
        ContainerError::Configuration(ConfigurationError::InvalidInterpolation {
            value: "invalid".into()
        })
    );
    assert!(err.to_string().contains("invalid"));
    assert!(!dir.path().join("bad.json").exists());
}

#[test]
fn invalid_solver_method_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    // No source container exists; validation must fail first.
    let err = patcher()
        .patch(
            dir.path(),
            Path::new("out.json"),
            &json!({"adjust": "missing.json", "solver_method": "fem"}),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Configuration(ConfigurationError::InvalidSolverMethod { ref value }) if value == "fem"
    ));
}

#[test]
fn adjust_is_required() {
    let dir = fixture_dir();
    let err = patcher()
        .patch(dir.path(), Path::new("out.json"), &json!({"solver_method": "pstd"}))
        .unwrap_err();
    assert_eq!(
        err,
        ContainerError::Configuration(ConfigurationError::MissingField {
            field: ADJUST_KEY.into()
        })
    );
}

#[test]
fn refuses_to_overwrite_source() {
    let dir = fixture_dir();
    let err = patcher()
        .patch(
            dir.path(),
            Path::new(SOURCE_NAME),
            &json!({"adjust": SOURCE_NAME, "solver_method": "pstd"}),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Configuration(ConfigurationError::OutputOverwritesSource { .. })
    ));
    let source = JsonContainerStore.load(&dir.path().join(SOURCE_NAME)).unwrap();
    assert_eq!(source.get(SOLVER_FLAG_KEY).unwrap().as_scalar(), Some(1.0));
}

#[test]
fn missing_source_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = patcher()
        .patch(dir.path(), Path::new("out.json"), &json!({"adjust": "absent.json"}))
        .unwrap_err();
    assert!(matches!(err, ContainerError::Read { .. }));
}

#[test]
fn newer_format_versions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.json");
    fs::write(
        &path,
        json!({"format": CONTAINER_FORMAT, "version": CONTAINER_FORMAT_VERSION + 1, "arrays": {}})
            .to_string(),
    )
    .unwrap();

    let err = JsonContainerStore.load(&path).unwrap_err();
    assert_eq!(
        err,
        ContainerError::UnsupportedVersion {
            path,
            version: CONTAINER_FORMAT_VERSION + 1
        }
    );
}

#[test]
fn provenance_keys_are_dropped_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("with_header.json");
    fs::write(
        &source,
        json!({
            "format": CONTAINER_FORMAT,
            "version": 1,
            "written_by": "some other tool 0.3",
            "arrays": {"usecd": {"shape": [1, 1], "data": {"dtype": "float64", "values": [1.0]}}}
        })
        .to_string(),
    )
    .unwrap();

    let output = patcher()
        .patch(dir.path(), Path::new("out.json"), &json!({"adjust": "with_header.json"}))
        .unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
    let keys: Vec<_> = written.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["arrays", "format", "version"]);
    assert_eq!(written["version"], json!(CONTAINER_FORMAT_VERSION));
}

#[test]
fn wrong_typed_override_names_the_field() {
    let err = VariantRequest::from_config(&json!({"adjust": "a.json", "interpolation": 2}))
        .unwrap_err();
    assert_eq!(err.field(), Some(INTERPOLATION_KEY));
}

#[test]
fn non_finite_floats_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field.json");
    let mut container = Container::new();
    container.insert(
        "Ex",
        NamedArray {
            shape: vec![1, 4],
            data: ArrayData::Float64(vec![1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
        },
    );

    JsonContainerStore.save(&path, &container).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw["arrays"]["Ex"]["data"]["values"],
        json!([1.5, "NaN", "Inf", "-Inf"])
    );

    let loaded = JsonContainerStore.load(&path).unwrap();
    match &loaded.get("Ex").unwrap().data {
        ArrayData::Float64(values) => {
            assert_eq!(values[0], 1.5);
            assert!(values[1].is_nan());
            assert_eq!(values[2], f64::INFINITY);
            assert_eq!(values[3], f64::NEG_INFINITY);
        }
        other => panic!("unexpected dtype: {other:?}"),
    }
}

#[test]
fn unknown_float_names_are_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_float.json");
    fs::write(
        &path,
        json!({
            "format": CONTAINER_FORMAT,
            "version": 1,
            "arrays": {"Ex": {"shape": [1, 1], "data": {"dtype": "float64", "values": ["nan?"]}}}
        })
        .to_string(),
    )
    .unwrap();

    assert!(matches!(
        JsonContainerStore.load(&path),
        Err(ContainerError::Parse { .. })
    ));
}

#[test]
fn null_override_is_an_invalid_choice() {
    let err = VariantRequest::from_config(&json!({"adjust": "a.json", "solver_method": null}))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidSolverMethod {
            value: "null".into()
        }
    );

    let err = VariantRequest::from_config(&json!({"adjust": "a.json", "interpolation": null}))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidInterpolation {
            value: "null".into()
        }
    );
}
