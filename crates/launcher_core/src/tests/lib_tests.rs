use super::*;
use anyhow::{anyhow, Result};
use shared::domain::Sample;
use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum EngineCall {
    InitializePaths {
        asset: PathBuf,
        temp: PathBuf,
        storage: Option<PathBuf>,
    },
    BeginSession(Vec<String>),
}

#[derive(Default)]
struct RecordingEngine {
    samples: Vec<Sample>,
    list_fails: bool,
    reject_paths: bool,
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    fn with_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("calls").clone()
    }
}

impl NativeEngine for RecordingEngine {
    fn list_samples(&self) -> Result<Vec<Sample>> {
        if self.list_fails {
            return Err(anyhow!("engine crashed while listing"));
        }
        Ok(self.samples.clone())
    }

    fn initialize_paths(&self, asset: &Path, temp: &Path, storage: Option<&Path>) -> Result<()> {
        self.calls
            .lock()
            .expect("calls")
            .push(EngineCall::InitializePaths {
                asset: asset.to_path_buf(),
                temp: temp.to_path_buf(),
                storage: storage.map(Path::to_path_buf),
            });
        if self.reject_paths {
            return Err(anyhow!("asset manager unavailable"));
        }
        Ok(())
    }

    fn begin_session(&self, arguments: &[String]) -> Result<()> {
        self.calls
            .lock()
            .expect("calls")
            .push(EngineCall::BeginSession(arguments.to_vec()));
        Ok(())
    }
}

fn launcher(engine: Arc<RecordingEngine>) -> Launcher {
    Launcher::new(engine, CategoryOrderPolicy::default())
}

fn samples() -> Vec<Sample> {
    vec![
        Sample::new("msaa", "MSAA", "performance"),
        Sample::new("hdr", "HDR", "lighting"),
        Sample::new("triangle", "Hello Triangle", "api"),
    ]
}

#[test]
fn start_with_full_grants_presents_ordered_catalog() {
    let launcher = launcher(Arc::new(RecordingEngine::with_samples(samples())));
    let state = launcher.start(PermissionGrants::all());

    let catalog = state.catalog().expect("ready");
    let tabs: Vec<&str> = catalog.categories().collect();
    assert_eq!(tabs, vec!["api", "performance", "lighting"]);
    assert_eq!(catalog.len(), 3);
}

#[test]
fn start_without_write_grant_requires_permission() {
    let launcher = launcher(Arc::new(RecordingEngine::with_samples(samples())));
    let state = launcher.start(PermissionGrants {
        read: true,
        write: false,
    });
    assert_eq!(
        state,
        PresentationState::PermissionRequired {
            missing: vec![Permission::WriteStorage]
        }
    );
}

#[test]
fn start_with_no_grants_lists_both_permissions() {
    let launcher = launcher(Arc::new(RecordingEngine::with_samples(samples())));
    let state = launcher.start(PermissionGrants::default());
    assert_eq!(
        state,
        PresentationState::PermissionRequired {
            missing: vec![Permission::ReadStorage, Permission::WriteStorage]
        }
    );
}

#[test]
fn start_without_engine_reports_unavailable() {
    let launcher = Launcher::without_engine(ENGINE_LOAD_FAILED, CategoryOrderPolicy::default());
    let state = launcher.start(PermissionGrants::all());
    assert_eq!(
        state,
        PresentationState::EngineUnavailable {
            reason: ENGINE_LOAD_FAILED.to_string()
        }
    );
    assert!(state.catalog().is_none());
    assert!(!launcher.is_engine_loaded());
}

#[test]
fn failed_sample_listing_presents_empty_catalog() {
    let engine = RecordingEngine {
        list_fails: true,
        ..RecordingEngine::default()
    };
    let state = launcher(Arc::new(engine)).start(PermissionGrants::all());
    assert!(state.catalog().expect("ready").is_empty());
}

#[test]
fn duplicate_engine_samples_do_not_block_start() {
    let mut listed = samples();
    listed.push(Sample::new("msaa", "MSAA again", "api"));
    let state = launcher(Arc::new(RecordingEngine::with_samples(listed)))
        .start(PermissionGrants::all());

    let catalog = state.catalog().expect("ready");
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.find("msaa").expect("msaa").display_name, "MSAA");
}

#[test]
fn launch_initializes_two_roots_before_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let roots = prepare_roots(dir.path(), false).expect("roots");
    let engine = Arc::new(RecordingEngine::default());

    launcher(engine.clone())
        .launch(&SelectionSpec::BySampleId("msaa".into()), &roots)
        .expect("launch");

    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::InitializePaths {
                asset: roots.asset.clone(),
                temp: roots.temp.clone(),
                storage: None,
            },
            EngineCall::BeginSession(vec!["msaa".to_string()]),
        ]
    );
}

#[test]
fn launch_passes_storage_root_in_three_root_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let roots = prepare_roots(dir.path(), true).expect("roots");
    let engine = Arc::new(RecordingEngine::default());

    launcher(engine.clone())
        .launch(&SelectionSpec::Demo, &roots)
        .expect("launch");

    let calls = engine.calls();
    assert_eq!(
        calls[0],
        EngineCall::InitializePaths {
            asset: roots.asset.clone(),
            temp: roots.temp.clone(),
            storage: roots.storage.clone(),
        }
    );
    assert_eq!(calls[1], EngineCall::BeginSession(Vec::new()));
}

#[test]
fn invalid_roots_never_reach_the_engine() {
    let engine = Arc::new(RecordingEngine::default());
    let err = launcher(engine.clone())
        .launch(&SelectionSpec::Demo, &FilesystemRoots::new("", "/tmp"))
        .expect_err("invalid roots");

    assert!(matches!(err, LaunchError::InvalidRoot { .. }));
    assert!(engine.calls().is_empty());
}

#[test]
fn engine_path_failure_aborts_without_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let roots = prepare_roots(dir.path(), false).expect("roots");
    let engine = Arc::new(RecordingEngine {
        reject_paths: true,
        ..RecordingEngine::default()
    });

    let err = launcher(engine.clone())
        .launch(&SelectionSpec::Demo, &roots)
        .expect_err("engine failure");

    assert_eq!(
        err,
        LaunchError::Engine("asset manager unavailable".to_string())
    );
    assert_eq!(engine.calls().len(), 1);
}

#[test]
fn launch_without_engine_is_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let roots = prepare_roots(dir.path(), false).expect("roots");
    let launcher = Launcher::without_engine("missing", CategoryOrderPolicy::default());

    assert_eq!(
        launcher.launch(&SelectionSpec::Demo, &roots),
        Err(LaunchError::EngineUnavailable("missing".to_string()))
    );
}

#[test]
fn launch_category_runs_selected_tab() {
    let dir = tempfile::tempdir().expect("tempdir");
    let roots = prepare_roots(dir.path(), false).expect("roots");
    let engine = Arc::new(RecordingEngine::with_samples(samples()));
    let launcher = launcher(engine.clone());
    let state = launcher.start(PermissionGrants::all());
    let catalog = state.catalog().expect("ready");

    launcher
        .launch_category(catalog, 1, &roots)
        .expect("launch tab");
    assert_eq!(
        engine.calls().last(),
        Some(&EngineCall::BeginSession(vec!["performance".to_string()]))
    );

    assert_eq!(
        launcher.launch_category(catalog, 3, &roots),
        Err(LaunchError::UnknownTab(3))
    );
}
