use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::auxiliary::auxiliary_path_for;
use crate::engine::{EngineArg, RecordedEvent, RecordingEngine};
use crate::translate::ConfigTranslator;

const ILLUMINATION_INPUT: &str = "I = 128;\nefname = 'efield.dat';\nhfname = 'hfield.dat';\n";

struct Fixture {
    dir: TempDir,
    translator: ConfigTranslator,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("input_file.m"), "I = 128;\n").unwrap();
        fs::write(dir.path().join("input_file_ill.m"), ILLUMINATION_INPUT).unwrap();
        let translator = ConfigTranslator::new(dir.path());
        Self { dir, translator }
    }

    fn descriptor(&self, config: serde_json::Value) -> CallDescriptor {
        self.translator
            .translate(self.dir.path().join("out"), &config)
            .expect("valid descriptor")
    }

    fn settings(&self) -> SessionSettings {
        SessionSettings {
            startup_options: vec!["-nodisplay".into(), "-nosplash".into()],
            working_dir: self.dir.path().to_path_buf(),
            search_paths: vec![self.dir.path().join("bscan"), self.dir.path().join("matlab")],
            entry_point: "run_bscan".into(),
        }
    }
}

#[test]
fn empty_batch_never_starts_engine() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let mut manager =
        EngineSessionManager::new(engine.clone(), fixture.settings(), Vec::<CallDescriptor>::new());

    let err = manager.run(true).unwrap_err();
    assert_eq!(err, EngineError::EmptyBatch);
    assert!(err.is_warning());
    assert_eq!(engine.sessions_started(), 0);
    assert!(engine.events().is_empty());
    assert!(!manager.is_running());
}

#[test]
fn batch_runs_in_order_within_one_session() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let first = fixture.descriptor(json!({"input_file": "input_file.m", "spatial_obstacles": ["fs", "cyl"]}));
    let second = fixture.descriptor(json!({"input_file": "input_file.m", "spatial_obstacles": ["fs", "sph"]}));
    let mut manager =
        EngineSessionManager::new(engine.clone(), fixture.settings(), vec![first, second]);

    let report = manager.run(true).unwrap();

    assert_eq!(report.outputs.len(), 2);
    assert_eq!(report.working_directory, fixture.dir.path());
    let calls = engine.calls();
    let obstacles: Vec<_> = calls.iter().map(|(_, call)| call.args[2].clone()).collect();
    assert_eq!(
        obstacles,
        vec![EngineArg::Text("cyl".into()), EngineArg::Text("sph".into())]
    );
    assert!(calls.iter().all(|(session, _)| *session == 1));
    assert_eq!(engine.sessions_started(), 1);
    assert!(!manager.is_running());
}

#[test]
fn session_setup_precedes_dispatch() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let descriptor = fixture.descriptor(json!({"input_file": "input_file.m", "spatial_obstacles": ["cyl"]}));
    let mut manager = EngineSessionManager::new(engine.clone(), fixture.settings(), descriptor);

    manager.run(true).unwrap();

    let events = engine.events();
    assert_eq!(
        events[0],
        RecordedEvent::Launch {
            session: 1,
            options: vec!["-nodisplay".into(), "-nosplash".into()]
        }
    );
    assert_eq!(
        events[1],
        RecordedEvent::Cd {
            session: 1,
            dir: fixture.dir.path().to_path_buf()
        }
    );
    assert!(matches!(events[2], RecordedEvent::AddPath { .. }));
    assert!(matches!(events[3], RecordedEvent::AddPath { .. }));
    assert!(matches!(events[4], RecordedEvent::Call { .. }));
    assert_eq!(events[5], RecordedEvent::Quit { session: 1 });
    assert!(manager.registered_paths().is_empty());
    assert_eq!(manager.working_directory(), None);
}

#[test]
fn engine_left_running_until_stopped() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let descriptor = fixture.descriptor(json!({"input_file": "input_file.m", "spatial_obstacles": ["cyl"]}));
    let mut manager = EngineSessionManager::new(engine.clone(), fixture.settings(), descriptor);

    manager.run(false).unwrap();
    assert!(manager.is_running());
    assert_eq!(manager.working_directory(), Some(fixture.dir.path()));
    assert_eq!(manager.registered_paths().len(), 2);
    assert!(!engine
        .events()
        .iter()
        .any(|event| matches!(event, RecordedEvent::Quit { .. })));

    manager.stop().unwrap();
    assert!(!manager.is_running());
    assert_eq!(manager.working_directory(), None);
    assert!(manager.registered_paths().is_empty());
    assert_eq!(manager.stop(), Err(EngineError::NotRunning));
}

#[test]
fn auxiliary_input_exists_only_during_dispatch() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let descriptor = fixture.descriptor(json!({
        "input_file": "input_file_ill.m",
        "spatial_obstacles": ["fs", "cyl"],
        "illsetup": true
    }));
    let auxiliary = auxiliary_path_for(descriptor.primary_input_path());
    assert!(!auxiliary.exists());

    let mut manager = EngineSessionManager::new(engine.clone(), fixture.settings(), descriptor);
    manager.run(true).unwrap();

    assert!(!auxiliary.exists());
    let events = engine.events();
    let (call, contents) = events
        .iter()
        .find_map(|event| match event {
            RecordedEvent::Call {
                call,
                auxiliary_contents,
                ..
            } => Some((call.clone(), auxiliary_contents.clone())),
            _ => None,
        })
        .expect("call recorded");
    assert_eq!(
        call.args[3],
        EngineArg::Text(auxiliary.to_string_lossy().into_owned())
    );
    assert_eq!(
        contents.as_deref(),
        Some("I = 128;\nefname = '';\nhfname = '';\n")
    );
}

#[test]
fn failed_call_still_removes_auxiliary_input_and_stops_batch() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    engine.fail_call(0);
    let failing = fixture.descriptor(json!({
        "input_file": "input_file_ill.m",
        "spatial_obstacles": ["sph"],
        "illsetup": true
    }));
    let skipped = fixture.descriptor(json!({"input_file": "input_file.m", "spatial_obstacles": ["cyl"]}));
    let auxiliary = auxiliary_path_for(failing.primary_input_path());
    let mut manager =
        EngineSessionManager::new(engine.clone(), fixture.settings(), vec![failing, skipped]);

    let err = manager.run(true).unwrap_err();

    match err {
        EngineError::CallFailed {
            function, output, ..
        } => {
            assert_eq!(function, "run_bscan");
            assert!(output.stdout.starts_with("run_bscan("));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!auxiliary.exists());
    assert_eq!(engine.calls().len(), 1);
    assert!(manager.is_running(), "lifecycle is left to the caller");
    manager.stop().unwrap();
}

#[test]
fn obstacle_edits_are_honored_at_dispatch() {
    let fixture = Fixture::new();
    let engine = RecordingEngine::new();
    let descriptor = fixture.descriptor(json!({
        "input_file": "input_file_ill.m",
        "spatial_obstacles": ["cyl", "sph"],
        "illsetup": true
    }));
    let auxiliary = auxiliary_path_for(descriptor.primary_input_path());
    let mut manager = EngineSessionManager::new(engine.clone(), fixture.settings(), descriptor);

    let err = manager.run(false).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Configuration(ConfigurationError::NonUniqueObstacle { .. })
    ));
    assert!(!auxiliary.exists());
    assert!(engine.calls().is_empty());

    manager.calls_mut()[0]
        .obstacle_set_mut()
        .retain(|tag| tag != "cyl");
    manager.run(true).unwrap();
    assert_eq!(engine.calls()[0].1.args[2], EngineArg::Text("sph".into()));
    assert_eq!(engine.sessions_started(), 1, "running session is reused");
}

#[test]
fn batch_construction_counts_every_invalid_element() {
    let fixture = Fixture::new();
    let translations = vec![
        fixture
            .translator
            .translate("out", &json!({"input_file": "input_file.m", "spatial_obstacles": ["cyl"]})),
        fixture
            .translator
            .translate("out", &json!({"spatial_obstacles": ["cyl"]})),
        fixture
            .translator
            .translate("out", &json!({"input_file": "nope.m", "spatial_obstacles": ["cyl"]})),
    ];

    let err = CallBatch::from_translations(translations).unwrap_err();
    assert_eq!(err, EngineError::InvalidBatch { invalid: 2, total: 3 });

    let batch = CallBatch::from_translations(vec![fixture
        .translator
        .translate("out", &json!({"input_file": "input_file.m", "spatial_obstacles": ["cyl"]}))])
    .unwrap();
    assert_eq!(batch.len(), 1);
}

#[test]
fn settings_follow_harness_config() {
    let config = HarnessConfig::rooted_at("/srv/input_generation");
    let settings = SessionSettings::from(&config);
    assert_eq!(settings.working_dir, PathBuf::from("/srv/input_generation"));
    assert_eq!(settings.search_paths.len(), 2);
    assert_eq!(settings.entry_point, "run_bscan");
}
